// Bounded-concurrency fetcher — retrying JSON GETs and streamed binary downloads behind one permit pool.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use reqwest::{Response, StatusCode};
use serde_json::Value;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, error, warn};

use super::cache::CacheStore;
use super::stats::HarvestStats;
use crate::config::RetryPolicy;
use crate::source::http_source::HttpSource;

enum JsonAttempt {
    Found(Value),
    NotFound,
}

enum DownloadAttempt {
    Saved(u64),
    Rejected(StatusCode),
}

pub struct Fetcher {
    source: Arc<HttpSource>,
    cache: Arc<CacheStore>,
    permits: Arc<Semaphore>,
    stats: Arc<HarvestStats>,
    retry: RetryPolicy,
}

impl Fetcher {
    pub fn new(
        source: Arc<HttpSource>,
        cache: Arc<CacheStore>,
        stats: Arc<HarvestStats>,
        max_concurrency: usize,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            source,
            cache,
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
            stats,
            retry,
        }
    }

    pub fn source(&self) -> &HttpSource {
        &self.source
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    async fn acquire(&self) -> Result<SemaphorePermit<'_>> {
        self.permits.acquire().await.map_err(|e| anyhow!("{}", e))
    }

    /// GET `url` and parse the body as JSON.
    ///
    /// A 404 returns `None` straight away; it is logged unless `ignore_not_found`.
    /// Anything else that goes wrong is retried up to the attempt ceiling, then
    /// logged and reported as `None`. A permit is held for one attempt at a time.
    pub async fn fetch_json(&self, url: &str, ignore_not_found: bool) -> Option<Value> {
        let max_attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.try_fetch_json(url).await {
                Ok(JsonAttempt::Found(value)) => {
                    self.stats.record_json_fetched();
                    return Some(value);
                }
                Ok(JsonAttempt::NotFound) => {
                    self.stats.record_not_found();
                    if !ignore_not_found {
                        warn!("404 not found: {}", url);
                    }
                    return None;
                }
                Err(e) if attempt < max_attempts => {
                    debug!("json fetch {} failed (attempt {}): {:#}", url, attempt, e);
                    tokio::time::sleep(self.retry.json_delay()).await;
                }
                Err(e) => {
                    error!(
                        "failed to fetch json {} after {} attempts: {:#}",
                        url, max_attempts, e
                    );
                    self.stats.record_json_failed();
                }
            }
        }

        None
    }

    async fn try_fetch_json(&self, url: &str) -> Result<JsonAttempt> {
        let _permit = self.acquire().await?;
        self.stats.increment_workers();
        let result = self.get_json(url).await;
        self.stats.decrement_workers();
        result
    }

    async fn get_json(&self, url: &str) -> Result<JsonAttempt> {
        let resp = self.source.get(url).await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(JsonAttempt::NotFound);
        }
        if !status.is_success() {
            return Err(anyhow!("HTTP {}", status.as_u16()));
        }

        let body = resp.bytes().await?;
        let value = serde_json::from_slice(&body)?;
        Ok(JsonAttempt::Found(value))
    }

    /// Stream `url` into `dest`, returning whether `dest` now holds the asset.
    ///
    /// An already-cached `dest` short-circuits before any permit is taken. A
    /// non-200 answer fails immediately; transport errors are retried. The body
    /// is staged next to `dest` and only renamed into place once complete.
    pub async fn download_binary(&self, url: &str, dest: &Path) -> bool {
        if self.cache.is_cached(dest).await {
            self.stats.record_asset_cached();
            return true;
        }

        if let Some(parent) = dest.parent() {
            if let Err(e) = fs::create_dir_all(parent).await {
                error!("cannot create {} for {}: {}", parent.display(), url, e);
                self.stats.record_asset_failed();
                return false;
            }
        }

        let max_attempts = self.retry.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            match self.try_download(url, dest).await {
                Ok(DownloadAttempt::Saved(bytes)) => {
                    debug!("asset {} saved ({} bytes)", url, bytes);
                    self.stats.record_asset_downloaded(bytes);
                    return true;
                }
                Ok(DownloadAttempt::Rejected(status)) => {
                    warn!("asset {} rejected: HTTP {}", url, status.as_u16());
                    self.stats.record_asset_failed();
                    return false;
                }
                Err(e) if attempt < max_attempts => {
                    debug!("asset download {} failed (attempt {}): {:#}", url, attempt, e);
                    tokio::time::sleep(self.retry.download_delay()).await;
                }
                Err(e) => {
                    error!(
                        "failed to download asset {} after {} attempts: {:#}",
                        url, max_attempts, e
                    );
                    self.stats.record_asset_failed();
                }
            }
        }

        false
    }

    async fn try_download(&self, url: &str, dest: &Path) -> Result<DownloadAttempt> {
        let _permit = self.acquire().await?;
        self.stats.increment_workers();
        let result = self.stream_to_cache(url, dest).await;
        self.stats.decrement_workers();
        result
    }

    async fn stream_to_cache(&self, url: &str, dest: &Path) -> Result<DownloadAttempt> {
        let mut resp = self.source.get(url).await?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Ok(DownloadAttempt::Rejected(status));
        }

        let staging = self.cache.stage(dest);
        let written = match stream_body(&mut resp, &staging).await {
            Ok(written) => written,
            Err(e) => {
                self.cache.discard(&staging).await;
                return Err(e);
            }
        };
        self.cache.promote(&staging, dest).await?;
        Ok(DownloadAttempt::Saved(written))
    }
}

async fn stream_body(resp: &mut Response, path: &Path) -> Result<u64> {
    let mut file = fs::File::create(path).await?;
    let mut written = 0u64;
    while let Some(chunk) = resp.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}
