// Harvest orchestration — per-category index/detail fan-out, then one deduplicated asset download pass.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::cache::{CacheRead, CacheStore};
use super::collector::AssetCollector;
use super::fetcher::Fetcher;
use super::resolver::AssetResolver;
use super::stats::{HarvestSnapshot, HarvestStats};
use crate::config::{Category, HarvestConfig};
use crate::source::http_source::HttpSource;

/// Handles every spawned task needs.
#[derive(Clone)]
struct Shared {
    fetcher: Arc<Fetcher>,
    cache: Arc<CacheStore>,
    assets: Arc<AssetCollector>,
    stats: Arc<HarvestStats>,
}

pub struct Harvester {
    config: HarvestConfig,
    shared: Shared,
}

impl Harvester {
    pub fn new(config: HarvestConfig) -> Result<Self> {
        config.validate()?;

        let source = Arc::new(HttpSource::new(&config)?);
        let cache = Arc::new(CacheStore::new(config.output_dir.clone(), config.force));
        let stats = Arc::new(HarvestStats::new());
        let fetcher = Arc::new(Fetcher::new(
            source,
            Arc::clone(&cache),
            Arc::clone(&stats),
            config.max_concurrency,
            config.retry.clone(),
        ));
        let assets = Arc::new(AssetCollector::new(AssetResolver::new(&config.asset_base)));

        Ok(Self {
            config,
            shared: Shared {
                fetcher,
                cache,
                assets,
                stats,
            },
        })
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    pub fn assets(&self) -> &AssetCollector {
        &self.shared.assets
    }

    pub fn stats(&self) -> HarvestSnapshot {
        self.shared.stats.snapshot()
    }

    /// Harvest every configured category in order, then download all discovered assets.
    pub async fn run(&self) -> HarvestSnapshot {
        info!(
            "harvest start: out={} languages={:?} categories={} force={}",
            self.config.output_dir.display(),
            self.config.languages,
            self.config.categories.len(),
            self.config.force
        );

        for category in &self.config.categories {
            self.harvest_category(category).await;
        }

        self.download_assets().await;

        let snap = self.shared.stats.snapshot();
        info!(
            "harvest done in {:.1}s: json fetched={} cached={} failed={} 404={}, assets downloaded={} cached={} failed={} ({} bytes), categories skipped={}",
            snap.elapsed.as_secs_f64(),
            snap.json_fetched,
            snap.json_cache_hits,
            snap.json_failed,
            snap.not_found,
            snap.assets_downloaded,
            snap.assets_cached,
            snap.assets_failed,
            snap.bytes_downloaded,
            snap.categories_skipped
        );
        snap
    }

    /// Fetch a category's index and all of its detail records.
    /// Returns `false` when the index could not be fetched and the category was skipped.
    pub async fn harvest_category(&self, category: &Category) -> bool {
        let Some(index) = self.fetch_index(category).await else {
            error!("index not found for category {}", category.name);
            self.shared.stats.record_category_skipped();
            return false;
        };

        self.shared.assets.collect(&index);

        let index_path = self.shared.cache.index_path(&category.name);
        if let Err(e) = self.shared.cache.write_atomic_json(&index_path, &index).await {
            error!("failed to write index for {}: {:#}", category.name, e);
        }

        let ids = extract_identifiers(&index);
        info!(
            "category {}: {} identifiers x {} languages",
            category.name,
            ids.len(),
            self.config.languages.len()
        );

        let source = self.shared.fetcher.source();
        let ignore_not_found = category.ignores_missing_details();
        let mut tasks = JoinSet::new();
        for id in &ids {
            for lang in &self.config.languages {
                let url = source.detail_url(lang, &category.detail_prefix, id);
                let path = self.shared.cache.detail_path(&category.name, lang, id);
                tasks.spawn(harvest_detail(
                    self.shared.clone(),
                    url,
                    path,
                    ignore_not_found,
                ));
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("detail task in category {} panicked: {}", category.name, e);
            }
        }

        info!(
            "category {} done, {} unique assets known",
            category.name,
            self.shared.assets.len()
        );
        true
    }

    /// Language-qualified index first, unqualified as the fallback.
    async fn fetch_index(&self, category: &Category) -> Option<Value> {
        let source = self.shared.fetcher.source();

        let primary = source.index_url(Some(&self.config.index_language), &category.index_file);
        if let Some(index) = self
            .shared
            .fetcher
            .fetch_json(&primary, false)
            .await
            .filter(has_content)
        {
            return Some(index);
        }

        let fallback = source.index_url(None, &category.index_file);
        self.shared
            .fetcher
            .fetch_json(&fallback, false)
            .await
            .filter(has_content)
    }

    /// Drain the asset set and download each URL once. Returns how many are now on disk.
    pub async fn download_assets(&self) -> usize {
        let urls = self.shared.assets.take();
        if urls.is_empty() {
            return 0;
        }
        info!("downloading {} unique assets", urls.len());

        let mut tasks = JoinSet::new();
        for url in urls {
            let Some(file_name) = asset_file_name(&url) else {
                warn!("asset url {} has no file name, skipping", url);
                continue;
            };
            let dest = self.shared.cache.asset_path(file_name);
            let fetcher = Arc::clone(&self.shared.fetcher);
            tasks.spawn(async move { fetcher.download_binary(&url, &dest).await });
        }

        let mut saved = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => saved += 1,
                Ok(false) => {}
                Err(e) => error!("asset download task panicked: {}", e),
            }
        }
        saved
    }
}

async fn harvest_detail(shared: Shared, url: String, path: PathBuf, ignore_not_found: bool) {
    let payload = match shared.cache.read_cached(&path).await {
        CacheRead::Hit(value) => {
            shared.stats.record_json_cache_hit();
            Some(value)
        }
        CacheRead::Miss => {
            let fetched = shared
                .fetcher
                .fetch_json(&url, ignore_not_found)
                .await
                .filter(has_content);
            if let Some(value) = &fetched {
                if let Err(e) = shared.cache.write_atomic_json(&path, value).await {
                    error!("failed to write {}: {:#}", path.display(), e);
                }
            }
            fetched
        }
    };

    if let Some(value) = payload {
        shared.assets.collect(&value);
    }
}

/// `null`, `{}` and `[]` carry nothing worth keeping.
fn has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

/// Identifiers listed by a category index: the keys of an object index, or the
/// `id` / `Id` field of each entry of an array index. Empty identifiers, and any
/// that are not a single path segment, are dropped.
pub fn extract_identifiers(index: &Value) -> Vec<String> {
    let ids: Vec<String> = match index {
        Value::Object(map) => map.keys().cloned().collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.get("id").or_else(|| item.get("Id")))
            .filter_map(identifier_string)
            .collect(),
        _ => Vec::new(),
    };

    ids.into_iter()
        .filter(|id| !id.is_empty())
        .filter(|id| {
            let usable = is_single_segment(id);
            if !usable {
                warn!("ignoring identifier {:?}: not a single path segment", id);
            }
            usable
        })
        .collect()
}

/// Identifiers become both a URL segment and a file name, so they must not
/// carry separators or name the current/parent directory.
fn is_single_segment(id: &str) -> bool {
    !id.contains('/') && !id.contains('\\') && id != "." && id != ".."
}

fn identifier_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Last path segment of an asset URL.
pub fn asset_file_name(url: &str) -> Option<&str> {
    url.rsplit('/').next().filter(|name| !name.is_empty())
}
