use crate::common::error::FetchError;
use async_trait::async_trait;
use std::time::Duration;

/// Per-request options passed through to the fetch layer.
#[derive(Clone, Debug, Default)]
pub struct FetchOptions {
    /// Pause before going to the network. Cache hits are never delayed.
    pub throttle: Option<Duration>,
}

impl FetchOptions {
    pub fn throttled(throttle: Option<Duration>) -> Self {
        Self { throttle }
    }
}

/// Network/cache-backed page source.
///
/// Implementations must be safe for concurrent callers working on distinct
/// locators; the detail enricher shares one instance across its workers.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, locator: &str, options: &FetchOptions) -> Result<String, FetchError>;

    /// Drop any cached content for `locator`. Idempotent.
    async fn invalidate(&self, locator: &str) -> Result<(), FetchError>;
}

#[async_trait]
impl<T: PageFetcher + ?Sized> PageFetcher for std::sync::Arc<T> {
    async fn fetch(&self, locator: &str, options: &FetchOptions) -> Result<String, FetchError> {
        (**self).fetch(locator, options).await
    }

    async fn invalidate(&self, locator: &str) -> Result<(), FetchError> {
        (**self).invalidate(locator).await
    }
}
