use crate::apis::vessel_finder::parse_detail_page;
use crate::app::ports::{FetchOptions, PageFetcher};
use crate::common::constants::DETAIL_PATH_PREFIX;
use crate::common::error::{Result, ScraperError};
use crate::common::types::{DetailFields, EnrichedRow, Fields, ListingRow};
use crate::observability::metrics::{self, MetricName};
use crate::pipeline::processing::fields::FieldAdapter;
use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Fans detail-page fetches out over a bounded pool and merges the results
/// back into the listing rows by load index.
pub struct DetailEnricher<F> {
    fetcher: F,
    base_url: Url,
    locator_prefix: String,
    pool_size: usize,
    adapter: FieldAdapter,
    options: FetchOptions,
}

impl<F: PageFetcher> DetailEnricher<F> {
    pub fn new(fetcher: F, base_url: &str, pool_size: usize) -> Result<Self> {
        if pool_size == 0 {
            return Err(ScraperError::Config("pool size must be at least 1".into()));
        }
        let base_url = Url::parse(base_url)
            .map_err(|e| ScraperError::Config(format!("invalid base url '{}': {}", base_url, e)))?;
        Ok(Self {
            fetcher,
            base_url,
            locator_prefix: DETAIL_PATH_PREFIX.to_string(),
            pool_size,
            adapter: FieldAdapter::default(),
            options: FetchOptions::default(),
        })
    }

    pub fn with_adapter(mut self, adapter: FieldAdapter) -> Self {
        self.adapter = adapter;
        self
    }

    pub fn with_locator_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.locator_prefix = prefix.into();
        self
    }

    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Absolute detail URL for a row, or `None` when the row is passed through.
    pub fn detail_url(&self, row: &ListingRow) -> Option<String> {
        let path = row.detail_locator.trim();
        if path.is_empty() || !path.starts_with(&self.locator_prefix) {
            return None;
        }
        self.base_url.join(path).ok().map(String::from)
    }

    /// Enrich `rows`, returning one row per input in input order.
    ///
    /// A failed unit keeps its listing fields; its enrichment fields come out
    /// missing. Failures never cancel sibling units. Every output row, fetched
    /// or not, goes through the field adapter once.
    #[instrument(skip(self, rows), fields(rows = rows.len(), pool_size = self.pool_size))]
    pub async fn enrich(&self, rows: &[ListingRow]) -> Vec<EnrichedRow> {
        let units: Vec<(usize, String)> = rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| self.detail_url(row).map(|url| (i, url)))
            .collect();
        let passed_through = rows.len() - units.len();
        debug!(tasks = units.len(), pool_size = self.pool_size, "dispatching detail units");

        // one slot per load index; each unit writes only its own slot
        let mut slots: Vec<Option<Fields>> = vec![None; rows.len()];
        let mut failed = 0usize;
        let mut results = stream::iter(units)
            .map(|(index, url)| async move { (index, self.load_unit(&url).await) })
            .buffer_unordered(self.pool_size);
        while let Some((index, detail)) = results.next().await {
            match detail {
                Some(detail) => slots[index] = Some(detail.0),
                None => failed += 1,
            }
        }
        drop(results);

        let detail_names: BTreeSet<String> = slots
            .iter()
            .flatten()
            .flat_map(|fields| self.adapter.output_names(fields))
            .map(str::to_string)
            .collect();

        let enriched: Vec<EnrichedRow> = rows
            .iter()
            .zip(slots)
            .enumerate()
            .map(|(load_index, (row, detail))| EnrichedRow {
                load_index,
                fields: self
                    .adapter
                    .adapt(&merge(row, detail.unwrap_or_default(), &detail_names)),
            })
            .collect();

        metrics::increment_by(MetricName::EnrichRowsPassedThrough, passed_through as u64);
        info!(
            rows = enriched.len(),
            failed,
            passed_through,
            detail_fields = detail_names.len(),
            "enrichment complete"
        );
        enriched
    }

    async fn load_unit(&self, url: &str) -> Option<DetailFields> {
        match self.load_detail(url).await {
            Ok(fields) => {
                metrics::increment(MetricName::EnrichUnitsSuccess);
                Some(fields)
            }
            Err(e) => {
                warn!(locator = url, error = %e, "detail page failed, row kept unenriched");
                metrics::increment(MetricName::EnrichUnitsFailed);
                if let Err(inv) = self.fetcher.invalidate(url).await {
                    warn!(locator = url, error = %inv, "cache invalidation failed");
                }
                None
            }
        }
    }

    async fn load_detail(&self, url: &str) -> Result<DetailFields> {
        let html = self.fetcher.fetch(url, &self.options).await?;
        parse_detail_page(url, &html)
    }
}

/// Listing fields overlaid with detail fields, then every name in
/// `detail_names` the row still lacks is added as missing.
pub fn merge(row: &ListingRow, detail: Fields, detail_names: &BTreeSet<String>) -> Fields {
    let mut fields = row.fields.clone();
    fields.extend(detail);
    for name in detail_names {
        fields.entry(name.clone()).or_insert(None);
    }
    fields
}
