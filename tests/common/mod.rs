#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use vessel_scraper::app::{FetchOptions, PageFetcher};
use vessel_scraper::FetchError;

pub const BASE: &str = "https://vessels.test";

/// Deterministic in-memory site. Unknown locators fail with a 404.
#[derive(Default)]
pub struct StubFetcher {
    pages: HashMap<String, (String, u64)>,
    pub fetched: Mutex<Vec<String>>,
    pub invalidated: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn page(mut self, locator: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(locator.into(), (html.into(), 0));
        self
    }

    /// Like `page` but the response is held back for `delay_ms`.
    pub fn slow_page(mut self, locator: impl Into<String>, html: impl Into<String>, delay_ms: u64) -> Self {
        self.pages.insert(locator.into(), (html.into(), delay_ms));
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn invalidated(&self) -> Vec<String> {
        self.invalidated.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, locator: &str, _options: &FetchOptions) -> Result<String, FetchError> {
        self.fetched.lock().unwrap().push(locator.to_string());
        match self.pages.get(locator) {
            Some((html, delay)) => {
                if *delay > 0 {
                    tokio::time::sleep(Duration::from_millis(*delay)).await;
                }
                Ok(html.clone())
            }
            None => Err(FetchError::Status {
                locator: locator.to_string(),
                status: 404,
            }),
        }
    }

    async fn invalidate(&self, locator: &str) -> Result<(), FetchError> {
        self.invalidated.lock().unwrap().push(locator.to_string());
        Ok(())
    }
}

pub fn listing_url(base: &str, code: &str, page: u32) -> String {
    format!("{}/vessels?t={}&page={}", base, code, page)
}

pub fn detail_path(name: &str, mmsi: u32) -> String {
    format!("/vessels/{}-MMSI-{}", name, mmsi)
}

/// One listing row: name, MMSI and an optional flag country.
pub struct Vessel<'a> {
    pub name: &'a str,
    pub mmsi: u32,
    pub flag: Option<&'a str>,
}

pub fn listing_html(vessels: &[Vessel<'_>], last_page: Option<u32>) -> String {
    let rows: String = vessels
        .iter()
        .map(|v| {
            let flag = v
                .flag
                .map(|f| format!(r#"<img class="ship-flag" title="Flag of {f}">"#))
                .unwrap_or_default();
            format!(
                r#"<div class="ship-row-details">
                     <header><a rel="bookmark" href="{}">{}</a>{}</header>
                     <div class="row param"><div>GT</div><div>1,000 t</div></div>
                   </div>"#,
                detail_path(v.name, v.mmsi),
                v.name,
                flag
            )
        })
        .collect();
    let pagination = last_page
        .map(|last| {
            format!(
                r#"<ul class="mypagination"><li class="last"><a href="/vessels?t=6&amp;page={last}">{last}</a></li></ul>"#
            )
        })
        .unwrap_or_default();
    format!(r#"<html><body><div id="vessels-list">{rows}{pagination}</div></body></html>"#)
}

pub fn detail_html(params: &[(&str, &str)]) -> String {
    let rows: String = params
        .iter()
        .map(|(name, value)| {
            format!(
                r#"<div class="row param"><span class="name">{name}:</span><span class="value">{value}</span></div>"#
            )
        })
        .collect();
    format!(
        r#"<html><body><div id="ais-data">{rows}</div>
           <time id="last_report_ts">2017-02-03 10:12 UTC</time></body></html>"#
    )
}
