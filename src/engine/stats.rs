// Run statistics — fetch, cache and download counters shared by all harvest tasks.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HarvestSnapshot {
    pub json_fetched: u64,
    pub json_cache_hits: u64,
    pub json_failed: u64,
    pub not_found: u64,
    pub assets_downloaded: u64,
    pub assets_cached: u64,
    pub assets_failed: u64,
    pub bytes_downloaded: u64,
    pub categories_skipped: u32,
    pub active_workers: u32,
    pub elapsed: Duration,
    /// Average asset download throughput over the run so far.
    pub download_bps: u64,
}

pub struct HarvestStats {
    json_fetched: AtomicU64,
    json_cache_hits: AtomicU64,
    json_failed: AtomicU64,
    not_found: AtomicU64,
    assets_downloaded: AtomicU64,
    assets_cached: AtomicU64,
    assets_failed: AtomicU64,
    bytes_downloaded: AtomicU64,
    categories_skipped: AtomicU32,
    active_workers: AtomicU32,
    started: Instant,
}

impl HarvestStats {
    pub fn new() -> Self {
        Self {
            json_fetched: AtomicU64::new(0),
            json_cache_hits: AtomicU64::new(0),
            json_failed: AtomicU64::new(0),
            not_found: AtomicU64::new(0),
            assets_downloaded: AtomicU64::new(0),
            assets_cached: AtomicU64::new(0),
            assets_failed: AtomicU64::new(0),
            bytes_downloaded: AtomicU64::new(0),
            categories_skipped: AtomicU32::new(0),
            active_workers: AtomicU32::new(0),
            started: Instant::now(),
        }
    }

    pub fn record_json_fetched(&self) {
        self.json_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_json_cache_hit(&self) {
        self.json_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_json_failed(&self) {
        self.json_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_asset_downloaded(&self, bytes: u64) {
        self.assets_downloaded.fetch_add(1, Ordering::Relaxed);
        self.bytes_downloaded.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_asset_cached(&self) {
        self.assets_cached.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_asset_failed(&self) {
        self.assets_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_category_skipped(&self) {
        self.categories_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_workers(&self) {
        self.active_workers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_workers(&self) {
        self.active_workers.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HarvestSnapshot {
        let elapsed = self.started.elapsed();
        let bytes_downloaded = self.bytes_downloaded.load(Ordering::Relaxed);
        let secs = elapsed.as_secs_f64();
        let download_bps = if secs > 0.1 {
            (bytes_downloaded as f64 / secs) as u64
        } else {
            0
        };

        HarvestSnapshot {
            json_fetched: self.json_fetched.load(Ordering::Relaxed),
            json_cache_hits: self.json_cache_hits.load(Ordering::Relaxed),
            json_failed: self.json_failed.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            assets_downloaded: self.assets_downloaded.load(Ordering::Relaxed),
            assets_cached: self.assets_cached.load(Ordering::Relaxed),
            assets_failed: self.assets_failed.load(Ordering::Relaxed),
            bytes_downloaded,
            categories_skipped: self.categories_skipped.load(Ordering::Relaxed),
            active_workers: self.active_workers.load(Ordering::Relaxed),
            elapsed,
            download_bps,
        }
    }
}

impl Default for HarvestStats {
    fn default() -> Self {
        Self::new()
    }
}
