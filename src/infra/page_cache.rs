use crate::app::ports::{FetchOptions, PageFetcher};
use crate::common::error::FetchError;
use crate::observability::metrics::{self, MetricName};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Keyed on-disk page cache in front of another fetcher.
///
/// Entries live at `<root>/<h[0..2]>/<h[2..4]>/<h>` where `h` is the
/// SHA-256 of the locator, so directories stay small however many pages
/// are cached.
pub struct CachedFetcher<F> {
    inner: F,
    root: PathBuf,
    tmp_seq: AtomicU64,
}

impl<F: PageFetcher> CachedFetcher<F> {
    pub fn new(inner: F, root: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            root: root.into(),
            tmp_seq: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entry_path(&self, locator: &str) -> PathBuf {
        entry_path(&self.root, locator)
    }

    /// Remove every cached entry.
    pub async fn clear(&self) -> Result<(), FetchError> {
        clear_dir(&self.root).await
    }

    async fn store(&self, locator: &str, content: &str) -> Result<(), FetchError> {
        let path = self.entry_path(locator);
        let cache_err = |source| FetchError::Cache {
            locator: locator.to_string(),
            source,
        };
        let dir = path.parent().unwrap_or(&self.root);
        tokio::fs::create_dir_all(dir).await.map_err(cache_err)?;

        // write-then-rename so concurrent readers never see a partial entry
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("tmp-{}-{}", std::process::id(), seq));
        tokio::fs::write(&tmp, content.as_bytes()).await.map_err(cache_err)?;
        tokio::fs::rename(&tmp, &path).await.map_err(cache_err)?;
        Ok(())
    }
}

#[async_trait]
impl<F: PageFetcher> PageFetcher for CachedFetcher<F> {
    async fn fetch(&self, locator: &str, options: &FetchOptions) -> Result<String, FetchError> {
        let path = self.entry_path(locator);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                metrics::increment(MetricName::CacheHits);
                debug!(locator, "cache hit");
                return Ok(content);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(FetchError::Cache {
                    locator: locator.to_string(),
                    source: e,
                })
            }
        }

        metrics::increment(MetricName::CacheMisses);
        let content = self.inner.fetch(locator, options).await?;
        self.store(locator, &content).await?;
        Ok(content)
    }

    async fn invalidate(&self, locator: &str) -> Result<(), FetchError> {
        let path = self.entry_path(locator);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                metrics::increment(MetricName::CacheInvalidations);
                info!(locator, "invalidated cache entry");
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(FetchError::Cache {
                    locator: locator.to_string(),
                    source: e,
                })
            }
        }
        self.inner.invalidate(locator).await
    }
}

pub fn entry_path(root: &Path, locator: &str) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(locator.as_bytes());
    let hex = hex::encode(hasher.finalize());
    root.join(&hex[0..2]).join(&hex[2..4]).join(&hex)
}

/// Delete a cache directory and everything under it. A missing directory is fine.
pub async fn clear_dir(root: &Path) -> Result<(), FetchError> {
    match tokio::fs::remove_dir_all(root).await {
        Ok(()) => {
            info!(root = %root.display(), "cache cleared");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(FetchError::Cache {
            locator: root.display().to_string(),
            source: e,
        }),
    }
}
