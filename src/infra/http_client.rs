use crate::app::ports::{FetchOptions, PageFetcher};
use crate::common::error::FetchError;
use crate::infra::rate_limiter::{Limits, RateLimiter};
use crate::observability::metrics::{self, MetricName};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::debug;

/// Fetches pages straight from the network. Nothing is cached here.
pub struct HttpFetcher {
    client: reqwest::Client,
    limiter: RateLimiter,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str, limits: Limits) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Http {
                locator: String::new(),
                source: e,
            })?;
        Ok(Self {
            client,
            limiter: RateLimiter::new(limits),
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, locator: &str, options: &FetchOptions) -> Result<String, FetchError> {
        if let Some(pause) = options.throttle {
            tokio::time::sleep(pause).await;
        }
        let _permit = self.limiter.acquire().await;

        let t0 = Instant::now();
        let resp = self.client.get(locator).send().await.map_err(|e| {
            metrics::increment(MetricName::FetchRequestsError);
            FetchError::Http {
                locator: locator.to_string(),
                source: e,
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            metrics::increment(MetricName::FetchRequestsError);
            return Err(FetchError::Status {
                locator: locator.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(|e| FetchError::Http {
            locator: locator.to_string(),
            source: e,
        })?;
        let secs = t0.elapsed().as_secs_f64();
        metrics::increment(MetricName::FetchRequestsSuccess);
        metrics::record(MetricName::FetchRequestDuration, secs);
        debug!(locator, bytes = body.len(), secs, "fetched");
        Ok(body)
    }

    async fn invalidate(&self, _locator: &str) -> Result<(), FetchError> {
        Ok(())
    }
}
