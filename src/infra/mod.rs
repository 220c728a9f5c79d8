// Infrastructure adapters behind the fetch port

pub mod http_client;
pub mod page_cache;
pub mod rate_limiter;

pub use http_client::HttpFetcher;
pub use page_cache::CachedFetcher;
pub use rate_limiter::{Limits, RateLimiter};

use crate::common::error::FetchError;
use crate::config::FetchConfig;
use std::path::Path;

/// Network fetcher with the configured limits, cached under `cache_root`.
pub fn cached_http_fetcher(
    config: &FetchConfig,
    cache_root: &Path,
) -> Result<CachedFetcher<HttpFetcher>, FetchError> {
    let limits = Limits {
        requests_per_min: config.requests_per_minute,
        concurrency: config.max_concurrent,
    };
    let http = HttpFetcher::new(config.timeout(), &config.user_agent, limits)?;
    Ok(CachedFetcher::new(http, cache_root))
}
