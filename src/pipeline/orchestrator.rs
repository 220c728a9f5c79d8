//! Entry functions tying the stages together.
//!
//! Fetchers and configuration are handed in by the caller; nothing here
//! reaches for process-wide state.

use crate::app::ports::{FetchOptions, PageFetcher};
use crate::common::error::Result;
use crate::common::types::{EnrichedRow, ListingRow};
use crate::config::Config;
use crate::observability::metrics::{self, MetricName};
use crate::pipeline::ingestion::PaginationCrawler;
use crate::pipeline::processing::enrich::DetailEnricher;
use crate::pipeline::processing::normalize::{NormalizedTable, Normalizer};
use crate::pipeline::storage::tabular;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// What a pipeline entry point did.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub stage: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub listing_rows: Option<usize>,
    pub enriched_rows: Option<usize>,
    pub normalized_rows: Option<usize>,
    pub outputs: Vec<PathBuf>,
}

impl PipelineReport {
    fn begin(stage: &str) -> Self {
        let now = Utc::now();
        Self {
            stage: stage.to_string(),
            started_at: now,
            finished_at: now,
            listing_rows: None,
            enriched_rows: None,
            normalized_rows: None,
            outputs: Vec::new(),
        }
    }

    fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        let secs = self.duration_secs();
        metrics::record(MetricName::PipelineDuration, secs);
        info!(
            stage = %self.stage,
            listing_rows = ?self.listing_rows,
            enriched_rows = ?self.enriched_rows,
            normalized_rows = ?self.normalized_rows,
            secs,
            "pipeline stage finished"
        );
        self
    }

    pub fn duration_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

#[derive(Debug, Clone)]
pub struct CrawlJob {
    pub entity_type: String,
    pub page_cap: Option<u32>,
    pub output: PathBuf,
}

#[derive(Debug, Clone)]
pub struct EnrichJob {
    pub input: PathBuf,
    pub head: Option<usize>,
    pub pool_size: Option<usize>,
    pub output: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CleanJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RunJob {
    pub crawl: CrawlJob,
    pub head: Option<usize>,
    pub pool_size: Option<usize>,
    pub details_output: PathBuf,
    pub clean_output: PathBuf,
}

pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn fetch_options(&self) -> FetchOptions {
        FetchOptions::throttled(self.config.fetch.throttle())
    }

    /// Walk the listing for an entity type name.
    #[instrument(skip(self, fetcher))]
    pub async fn crawl<F: PageFetcher>(
        &self,
        fetcher: F,
        entity_type: &str,
        page_cap: Option<u32>,
    ) -> Result<Vec<ListingRow>> {
        let code = self.config.site.type_code(entity_type)?;
        let crawler = PaginationCrawler::new(fetcher, &self.config.site.base_url, self.fetch_options());
        crawler.crawl_all(&code, page_cap).await
    }

    #[instrument(skip(self, fetcher, rows), fields(rows = rows.len()))]
    pub async fn enrich<F: PageFetcher>(
        &self,
        fetcher: F,
        rows: &[ListingRow],
        pool_size: Option<usize>,
    ) -> Result<Vec<EnrichedRow>> {
        let enricher = DetailEnricher::new(
            fetcher,
            &self.config.site.base_url,
            pool_size.unwrap_or(self.config.enrich.pool_size),
        )?
        .with_locator_prefix(self.config.enrich.detail_prefix.clone())
        .with_adapter(self.config.enrich.adapter.clone())
        .with_options(self.fetch_options());
        Ok(enricher.enrich(rows).await)
    }

    pub fn normalize(&self, rows: &[EnrichedRow]) -> Result<NormalizedTable> {
        Normalizer::new(self.config.normalize.schema.clone()).normalize(rows)
    }

    /// Crawl and write the listing file.
    pub async fn crawl_to_file<F: PageFetcher>(&self, fetcher: F, job: &CrawlJob) -> Result<PipelineReport> {
        let mut report = PipelineReport::begin("crawl");
        let rows = self.crawl(fetcher, &job.entity_type, job.page_cap).await?;
        tabular::write_listing(&job.output, &rows)?;
        report.listing_rows = Some(rows.len());
        report.outputs.push(job.output.clone());
        Ok(report.finish())
    }

    /// Read a listing file, enrich it and write the merged rows.
    pub async fn enrich_file<F: PageFetcher>(&self, fetcher: F, job: &EnrichJob) -> Result<PipelineReport> {
        let mut report = PipelineReport::begin("details");
        let rows = tabular::read_listing(&job.input, job.head)?;
        report.listing_rows = Some(rows.len());
        let enriched = self.enrich(fetcher, &rows, job.pool_size).await?;
        tabular::write_enriched(&job.output, &enriched)?;
        report.enriched_rows = Some(enriched.len());
        report.outputs.push(job.output.clone());
        Ok(report.finish())
    }

    /// Read merged rows, normalize and write the table.
    pub fn clean_file(&self, job: &CleanJob) -> Result<PipelineReport> {
        let mut report = PipelineReport::begin("clean");
        let rows = tabular::read_enriched(&job.input)?;
        report.enriched_rows = Some(rows.len());
        let table = self.normalize(&rows)?;
        report.normalized_rows = Some(table.len());
        report.outputs.extend(self.write_table(&table, &job.output)?);
        Ok(report.finish())
    }

    /// Crawl, enrich and normalize in one go, writing every intermediate file.
    #[instrument(skip(self, listing_fetcher, detail_fetcher, job))]
    pub async fn run<L: PageFetcher, D: PageFetcher>(
        &self,
        listing_fetcher: L,
        detail_fetcher: D,
        job: &RunJob,
    ) -> Result<PipelineReport> {
        let mut report = PipelineReport::begin("run");

        let mut rows = self
            .crawl(listing_fetcher, &job.crawl.entity_type, job.crawl.page_cap)
            .await?;
        tabular::write_listing(&job.crawl.output, &rows)?;
        report.outputs.push(job.crawl.output.clone());
        report.listing_rows = Some(rows.len());

        if let Some(head) = job.head {
            rows.truncate(head.saturating_add(1));
        }
        let enriched = self.enrich(detail_fetcher, &rows, job.pool_size).await?;
        tabular::write_enriched(&job.details_output, &enriched)?;
        report.outputs.push(job.details_output.clone());
        report.enriched_rows = Some(enriched.len());

        let table = self.normalize(&enriched)?;
        report.normalized_rows = Some(table.len());
        report.outputs.extend(self.write_table(&table, &job.clean_output)?);

        Ok(report.finish())
    }

    fn write_table(&self, table: &NormalizedTable, output: &Path) -> Result<Vec<PathBuf>> {
        tabular::write_table(output, table)?;
        let mut written = vec![output.to_path_buf()];
        if self.config.normalize.write_json {
            let json = output.with_extension("json");
            tabular::write_json(&json, table)?;
            written.push(json);
        }
        Ok(written)
    }
}
