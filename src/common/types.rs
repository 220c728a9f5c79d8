use crate::common::constants::LISTING_PATH;
use crate::common::error::{Result, ScraperError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Field name to raw value. `None` is the one and only "missing" marker:
/// absent keys, empty strings and placeholder tokens all end up as `None`.
pub type Fields = BTreeMap<String, Option<String>>;

/// Identifies one listing page. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocator {
    base: Url,
    entity_type_code: String,
    page: u32,
    url: String,
}

impl PageLocator {
    pub fn new(base_url: &str, entity_type_code: &str, page: u32) -> Result<Self> {
        if page == 0 {
            return Err(ScraperError::Config("page numbers start at 1".into()));
        }
        let base = Url::parse(base_url)
            .map_err(|e| ScraperError::Config(format!("invalid base url '{}': {}", base_url, e)))?;
        let mut url = base
            .join(LISTING_PATH)
            .map_err(|e| ScraperError::Config(format!("invalid listing url: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("t", entity_type_code)
            .append_pair("page", &page.to_string());

        Ok(Self {
            base,
            entity_type_code: entity_type_code.to_string(),
            page,
            url: url.to_string(),
        })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn entity_type_code(&self) -> &str {
        &self.entity_type_code
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Locator of the following page.
    pub fn next(&self) -> Self {
        let mut url = self.base.join(LISTING_PATH).unwrap_or_else(|_| self.base.clone());
        url.query_pairs_mut()
            .append_pair("t", &self.entity_type_code)
            .append_pair("page", &(self.page + 1).to_string());
        Self {
            base: self.base.clone(),
            entity_type_code: self.entity_type_code.clone(),
            page: self.page + 1,
            url: url.to_string(),
        }
    }
}

impl std::fmt::Display for PageLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

/// One row of a listing page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingRow {
    pub fields: Fields,
    /// Relative path of the detail page, empty when the listing had none.
    pub detail_locator: String,
}

impl ListingRow {
    pub fn value(&self, name: &str) -> Option<&str> {
        lookup(&self.fields, name)
    }
}

/// Raw fields scraped from one detail page, before adaptation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailFields(pub Fields);

impl DetailFields {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Option<String>) {
        self.0.insert(name.into(), value);
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        lookup(&self.0, name)
    }
}

/// A listing row merged with its detail fields, tagged with its load index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRow {
    pub load_index: usize,
    pub fields: Fields,
}

impl EnrichedRow {
    pub fn value(&self, name: &str) -> Option<&str> {
        lookup(&self.fields, name)
    }
}

fn lookup<'a>(fields: &'a Fields, name: &str) -> Option<&'a str> {
    fields.get(name).and_then(|v| v.as_deref())
}
