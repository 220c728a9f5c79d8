use thiserror::Error;

/// Failures of the fetch/cache layer.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed for {locator}: {source}")]
    Http {
        locator: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP status {status} for {locator}")]
    Status { locator: String, status: u16 },

    #[error("cache error for {locator}: {source}")]
    Cache {
        locator: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to parse {locator}: {message}")]
    Parse { locator: String, message: String },

    #[error("column '{column}' of row '{key}' is not numeric: '{value}'")]
    Coercion {
        column: String,
        key: String,
        value: String,
    },

    #[error("crawl aborted at page {page} ({locator}): {source}")]
    Crawl {
        page: u32,
        locator: String,
        #[source]
        source: Box<ScraperError>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScraperError {
    pub fn parse(locator: impl Into<String>, message: impl Into<String>) -> Self {
        ScraperError::Parse {
            locator: locator.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScraperError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crawl_error_reports_page_and_cause() {
        let err = ScraperError::Crawl {
            page: 3,
            locator: "https://example.test/vessels?t=6&page=3".into(),
            source: Box::new(ScraperError::parse("p3", "missing row table")),
        };
        let msg = err.to_string();
        assert!(msg.contains("page 3"));
        assert!(msg.contains("page=3"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn fetch_error_converts_into_scraper_error() {
        let err: ScraperError = FetchError::Status {
            locator: "https://example.test/x".into(),
            status: 503,
        }
        .into();
        assert!(matches!(err, ScraperError::Fetch(FetchError::Status { status: 503, .. })));
    }
}
