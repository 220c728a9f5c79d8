//! Metric names and recording helpers.
//!
//! Recording goes through the `metrics` facade; without an installed
//! recorder every call is a no-op, so library users pay nothing unless they
//! opt in with their own exporter.

use std::fmt;

/// All metric names used in the system, so call sites never spell strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Fetch layer
    FetchRequestsSuccess,
    FetchRequestsError,
    FetchRequestDuration,
    CacheHits,
    CacheMisses,
    CacheInvalidations,

    // Crawl
    CrawlPagesFetched,
    CrawlPageFailures,
    CrawlRowsExtracted,

    // Detail enrichment
    EnrichUnitsSuccess,
    EnrichUnitsFailed,
    EnrichRowsPassedThrough,

    // Normalize
    NormalizeRowsIn,
    NormalizeRowsDropped,
    NormalizeRowsOut,

    PipelineDuration,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::FetchRequestsSuccess => "vessel_fetch_requests_success_total",
            MetricName::FetchRequestsError => "vessel_fetch_requests_error_total",
            MetricName::FetchRequestDuration => "vessel_fetch_request_duration_seconds",
            MetricName::CacheHits => "vessel_cache_hits_total",
            MetricName::CacheMisses => "vessel_cache_misses_total",
            MetricName::CacheInvalidations => "vessel_cache_invalidations_total",

            MetricName::CrawlPagesFetched => "vessel_crawl_pages_fetched_total",
            MetricName::CrawlPageFailures => "vessel_crawl_page_failures_total",
            MetricName::CrawlRowsExtracted => "vessel_crawl_rows_extracted_total",

            MetricName::EnrichUnitsSuccess => "vessel_enrich_units_success_total",
            MetricName::EnrichUnitsFailed => "vessel_enrich_units_failed_total",
            MetricName::EnrichRowsPassedThrough => "vessel_enrich_rows_passed_through_total",

            MetricName::NormalizeRowsIn => "vessel_normalize_rows_in_total",
            MetricName::NormalizeRowsDropped => "vessel_normalize_rows_dropped_total",
            MetricName::NormalizeRowsOut => "vessel_normalize_rows_out_total",

            MetricName::PipelineDuration => "vessel_pipeline_duration_seconds",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn increment(name: MetricName) {
    ::metrics::counter!(name.as_str()).increment(1);
}

pub fn increment_by(name: MetricName, n: u64) {
    ::metrics::counter!(name.as_str()).increment(n);
}

/// Rows dropped by a named normalizer step.
pub fn rows_dropped(step: &'static str, n: usize) {
    ::metrics::counter!(MetricName::NormalizeRowsDropped.as_str(), "step" => step).increment(n as u64);
}

pub fn record(name: MetricName, value: f64) {
    ::metrics::histogram!(name.as_str()).record(value);
}
