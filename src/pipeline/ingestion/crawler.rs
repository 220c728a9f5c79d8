use crate::apis::vessel_finder::{parse_listing_page, PageSignal};
use crate::app::ports::{FetchOptions, PageFetcher};
use crate::common::error::{Result, ScraperError};
use crate::common::types::{ListingRow, PageLocator};
use crate::observability::metrics::{self, MetricName};
use tracing::{error, info, instrument, warn};

/// Walks the listing one page at a time until the site says there are no
/// more pages or the optional cap is reached.
///
/// Pages are fetched strictly in sequence: whether page `n + 1` exists is
/// only known once page `n` is parsed.
pub struct PaginationCrawler<F> {
    fetcher: F,
    base_url: String,
    options: FetchOptions,
}

impl<F: PageFetcher> PaginationCrawler<F> {
    pub fn new(fetcher: F, base_url: impl Into<String>, options: FetchOptions) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            options,
        }
    }

    /// Fetch every listing page for `entity_type_code`, rows in page then
    /// in-page order. Any page failure aborts the whole crawl.
    #[instrument(skip(self))]
    pub async fn crawl_all(
        &self,
        entity_type_code: &str,
        page_cap: Option<u32>,
    ) -> Result<Vec<ListingRow>> {
        let mut locator = PageLocator::new(&self.base_url, entity_type_code, 1)?;
        let mut rows = Vec::new();
        loop {
            let (page_rows, completed) = self.load_page(&locator, page_cap).await?;
            rows.extend(page_rows);
            if completed {
                break;
            }
            locator = locator.next();
        }
        info!(pages = locator.page(), rows = rows.len(), "crawl complete");
        Ok(rows)
    }

    /// Fetch and parse one page; returns its rows and whether the crawl is done.
    pub async fn load_page(
        &self,
        locator: &PageLocator,
        page_cap: Option<u32>,
    ) -> Result<(Vec<ListingRow>, bool)> {
        match self.try_load_page(locator, page_cap).await {
            Ok(out) => Ok(out),
            Err(e) => {
                error!(page = locator.page(), locator = %locator, error = %e, "failed to load page");
                metrics::increment(MetricName::CrawlPageFailures);
                // a malformed cached copy must not be replayed on retry
                if let Err(inv) = self.fetcher.invalidate(locator.url()).await {
                    warn!(locator = %locator, error = %inv, "cache invalidation failed");
                }
                Err(ScraperError::Crawl {
                    page: locator.page(),
                    locator: locator.url().to_string(),
                    source: Box::new(e),
                })
            }
        }
    }

    async fn try_load_page(
        &self,
        locator: &PageLocator,
        page_cap: Option<u32>,
    ) -> Result<(Vec<ListingRow>, bool)> {
        let html = self.fetcher.fetch(locator.url(), &self.options).await?;
        metrics::increment(MetricName::CrawlPagesFetched);
        let page = parse_listing_page(locator.url(), &html)?;
        metrics::increment_by(MetricName::CrawlRowsExtracted, page.rows.len() as u64);

        let current = locator.page();
        let last = match &page.signal {
            PageSignal::LastPage(last) => Some(*last),
            PageSignal::Absent => None,
            PageSignal::Unreadable(href) => {
                warn!(page = current, href = %href, "unreadable pagination, stopping");
                None
            }
        };
        info!(page = current, last = ?last, cap = ?page_cap, rows = page.rows.len(), "processed page");
        Ok((page.rows, is_completed(current, last, page_cap)))
    }
}

/// Done once the current page reaches the reported last page or the cap.
/// With no readable last page the current page is treated as final.
pub fn is_completed(current: u32, last: Option<u32>, page_cap: Option<u32>) -> bool {
    let reached_last = last.map_or(true, |last| current >= last);
    let reached_cap = page_cap.map_or(false, |cap| current >= cap);
    reached_last || reached_cap
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::FetchError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MapFetcher {
        pages: HashMap<String, String>,
        fetched: Mutex<Vec<String>>,
        invalidated: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PageFetcher for MapFetcher {
        async fn fetch(&self, locator: &str, _o: &FetchOptions) -> std::result::Result<String, FetchError> {
            self.fetched.lock().unwrap().push(locator.to_string());
            self.pages.get(locator).cloned().ok_or(FetchError::Status {
                locator: locator.to_string(),
                status: 404,
            })
        }

        async fn invalidate(&self, locator: &str) -> std::result::Result<(), FetchError> {
            self.invalidated.lock().unwrap().push(locator.to_string());
            Ok(())
        }
    }

    const BASE: &str = "https://example.test";

    fn url(page: u32) -> String {
        format!("{}/vessels?t=6&page={}", BASE, page)
    }

    fn page_html(names: &[&str], last: Option<&str>) -> String {
        let rows: String = names
            .iter()
            .map(|n| {
                format!(
                    r#"<div class="ship-row-details"><header><a rel="bookmark" href="/vessels/{n}-MMSI-1">{n}</a></header></div>"#
                )
            })
            .collect();
        let pagination = last
            .map(|l| format!(r#"<ul class="mypagination"><li class="last"><a href="/vessels?t=6&page={l}">L</a></li></ul>"#))
            .unwrap_or_default();
        format!(r#"<html><body><div id="vessels-list">{rows}{pagination}</div></body></html>"#)
    }

    #[test]
    fn completion_rules() {
        assert!(!is_completed(1, Some(3), None));
        assert!(is_completed(3, Some(3), None));
        assert!(is_completed(4, Some(3), None));
        assert!(is_completed(1, None, None));
        assert!(is_completed(2, Some(10), Some(2)));
        assert!(!is_completed(1, Some(10), Some(2)));
    }

    #[tokio::test]
    async fn stops_at_page_cap() {
        let mut fetcher = MapFetcher::default();
        for p in 1..=5 {
            fetcher.pages.insert(url(p), page_html(&[&format!("S{p}")], Some("5")));
        }
        let crawler = PaginationCrawler::new(fetcher, BASE, FetchOptions::default());
        let rows = crawler.crawl_all("6", Some(2)).await.unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.value("ship_name").unwrap().to_string()).collect();
        assert_eq!(names, vec!["S1", "S2"]);
        assert_eq!(*crawler.fetcher.fetched.lock().unwrap(), vec![url(1), url(2)]);
    }

    #[tokio::test]
    async fn unreadable_signal_stops_crawl() {
        let mut fetcher = MapFetcher::default();
        fetcher.pages.insert(url(1), page_html(&["A"], Some("oops")));
        fetcher.pages.insert(url(2), page_html(&["B"], Some("2")));
        let crawler = PaginationCrawler::new(fetcher, BASE, FetchOptions::default());
        let rows = crawler.crawl_all("6", None).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn failed_page_invalidates_and_aborts() {
        let mut fetcher = MapFetcher::default();
        fetcher.pages.insert(url(1), page_html(&["A"], Some("3")));
        fetcher.pages.insert(url(2), r#"<div class="ship-row-details">broken</div>"#.to_string());
        let crawler = PaginationCrawler::new(fetcher, BASE, FetchOptions::default());

        let err = crawler.crawl_all("6", None).await.unwrap_err();
        match err {
            ScraperError::Crawl { page, locator, source } => {
                assert_eq!(page, 2);
                assert_eq!(locator, url(2));
                assert!(matches!(*source, ScraperError::Parse { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(*crawler.fetcher.invalidated.lock().unwrap(), vec![url(2)]);
    }

    #[tokio::test]
    async fn fetch_failure_is_wrapped_as_crawl_error() {
        let fetcher = MapFetcher::default();
        let crawler = PaginationCrawler::new(fetcher, BASE, FetchOptions::default());
        let err = crawler.crawl_all("6", None).await.unwrap_err();
        assert!(matches!(
            err,
            ScraperError::Crawl { page: 1, ref source, .. } if matches!(**source, ScraperError::Fetch(_))
        ));
        assert_eq!(crawler.fetcher.invalidated.lock().unwrap().len(), 1);
    }
}
