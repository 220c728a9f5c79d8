use crate::common::constants::{
    entity_type_code, supported_entity_types, DEFAULT_ENTITY_TYPE, DEFAULT_POOL_SIZE, DETAILS_CACHE_DIR,
    DETAIL_PATH_PREFIX, LISTING_CACHE_DIR, SITE_BASE_URL,
};
use crate::common::error::{Result, ScraperError};
use crate::observability::logging::LogConfig;
use crate::pipeline::processing::fields::FieldAdapter;
use crate::pipeline::processing::normalize::summary::{default_segments, Segment};
use crate::pipeline::processing::normalize::TableSchema;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "vessel_scraper.toml";
pub const CONFIG_ENV_VAR: &str = "VESSEL_SCRAPER_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub fetch: FetchConfig,
    pub enrich: EnrichConfig,
    pub normalize: NormalizeConfig,
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub base_url: String,
    pub entity_type: String,
    /// Extra or overriding entity type name to listing code entries.
    pub entity_types: BTreeMap<String, String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: SITE_BASE_URL.to_string(),
            entity_type: DEFAULT_ENTITY_TYPE.to_string(),
            entity_types: BTreeMap::new(),
        }
    }
}

impl SiteConfig {
    /// Listing code for an entity type name; configured entries win over
    /// the built-in ones.
    pub fn type_code(&self, name: &str) -> Result<String> {
        self.entity_types
            .get(name)
            .cloned()
            .or_else(|| entity_type_code(name).map(str::to_string))
            .ok_or_else(|| {
                let mut known: Vec<&str> = supported_entity_types();
                known.extend(self.entity_types.keys().map(String::as_str));
                ScraperError::Config(format!(
                    "unknown entity type '{}' (known: {})",
                    name,
                    known.join(", ")
                ))
            })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
    /// Pause before each network request (cache hits are not paused).
    pub throttle_ms: Option<u64>,
    pub requests_per_minute: Option<u64>,
    pub max_concurrent: Option<u32>,
    pub listing_cache_dir: String,
    pub details_cache_dir: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            user_agent: concat!("vessel_scraper/", env!("CARGO_PKG_VERSION")).to_string(),
            throttle_ms: None,
            requests_per_minute: None,
            max_concurrent: None,
            listing_cache_dir: LISTING_CACHE_DIR.to_string(),
            details_cache_dir: DETAILS_CACHE_DIR.to_string(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn throttle(&self) -> Option<Duration> {
        self.throttle_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichConfig {
    pub pool_size: usize,
    pub detail_prefix: String,
    pub adapter: FieldAdapter,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            detail_prefix: DETAIL_PATH_PREFIX.to_string(),
            adapter: FieldAdapter::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    pub schema: TableSchema,
    pub segments: Vec<Segment>,
    /// Also write the normalized table as JSON next to the CSV.
    pub write_json: bool,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            schema: TableSchema::default(),
            segments: default_segments(),
            write_json: false,
        }
    }
}

impl Config {
    /// Resolve the configuration file: explicit path, then the
    /// `VESSEL_SCRAPER_CONFIG` variable, then `vessel_scraper.toml` if it
    /// exists. No file means built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => match std::env::var(CONFIG_ENV_VAR) {
                Ok(v) if !v.trim().is_empty() => Some(PathBuf::from(v)),
                _ => {
                    let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                    default.exists().then_some(default)
                }
            },
        };

        match path {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ScraperError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.enrich.pool_size == 0 {
            return Err(ScraperError::Config("enrich.pool_size must be at least 1".into()));
        }
        if self.normalize.schema.key_column.trim().is_empty() {
            return Err(ScraperError::Config("normalize.schema.key_column is empty".into()));
        }
        if let Some(rule) = self.normalize.schema.outlier_rules.iter().find(|r| !(r.k >= 0.0)) {
            return Err(ScraperError::Config(format!(
                "outlier rule on '{}' needs a non-negative k",
                rule.column
            )));
        }
        url::Url::parse(&self.site.base_url).map_err(|e| {
            ScraperError::Config(format!("invalid site.base_url '{}': {}", self.site.base_url, e))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_the_vessel_site() {
        let config = Config::default();
        assert_eq!(config.site.base_url, "https://www.vesselfinder.com");
        assert_eq!(config.site.type_code("Tanker").unwrap(), "6");
        assert_eq!(config.enrich.pool_size, 20);
        assert_eq!(config.fetch.listing_cache_dir, "urlcaching");
        assert_eq!(config.normalize.segments.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_overrides_only_what_it_names() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [site]
            entity_type = "Bulk carriers"
            [site.entity_types]
            "Bulk carriers" = "401"

            [fetch]
            throttle_ms = 250

            [enrich]
            pool_size = 4

            [[normalize.schema.outlier_rules]]
            column = "Width"
            k = 3.0
            "#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.site.type_code("Bulk carriers").unwrap(), "401");
        assert_eq!(config.site.type_code("Tanker").unwrap(), "6");
        assert_eq!(config.fetch.throttle(), Some(Duration::from_millis(250)));
        assert_eq!(config.fetch.timeout_seconds, 30);
        assert_eq!(config.enrich.pool_size, 4);
        assert_eq!(config.normalize.schema.key_column, "IMO");
        assert_eq!(config.normalize.schema.outlier_rules.len(), 1);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(Config::from_toml("[enrich]\npool_size = 0").is_err());
        assert!(Config::from_toml("[site]\nbase_url = \"nope\"").is_err());
        assert!(Config::from_toml("[site]\nunknown = ").is_err());
        assert!(Config::default().site.type_code("Ferry").is_err());
    }
}
