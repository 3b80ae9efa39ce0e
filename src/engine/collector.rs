// Recursive asset discovery over arbitrary JSON payloads, accumulated into one run-wide set.

use std::collections::BTreeSet;

use parking_lot::Mutex;
use serde_json::Value;

use super::resolver::AssetResolver;
use crate::config::ENGINE_ASSET_ROOT;

/// Whether a string leaf looks like an asset reference worth resolving.
///
/// Full engine paths always qualify. UI icon paths are sometimes stored
/// without the engine root, so anything under `/UI/` with a dot qualifies too.
pub fn is_asset_candidate(s: &str) -> bool {
    s.contains(ENGINE_ASSET_ROOT) || (s.contains("/UI/") && s.contains('.'))
}

/// Walk `value` and insert the resolved URL of every candidate string into `sink`.
pub fn collect_asset_urls(value: &Value, resolver: &AssetResolver, sink: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            for v in map.values() {
                collect_asset_urls(v, resolver, sink);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_asset_urls(item, resolver, sink);
            }
        }
        Value::String(s) => {
            if is_asset_candidate(s) {
                if let Some(url) = resolver.resolve(s) {
                    sink.insert(url);
                }
            }
        }
        _ => {}
    }
}

/// Deduplicated asset URLs discovered over a whole run. Safe to share across tasks.
pub struct AssetCollector {
    resolver: AssetResolver,
    urls: Mutex<BTreeSet<String>>,
}

impl AssetCollector {
    pub fn new(resolver: AssetResolver) -> Self {
        Self {
            resolver,
            urls: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn resolver(&self) -> &AssetResolver {
        &self.resolver
    }

    /// Scan a payload and merge its assets into the run-wide set.
    /// Returns how many URLs were not already known.
    pub fn collect(&self, value: &Value) -> usize {
        let mut found = BTreeSet::new();
        collect_asset_urls(value, &self.resolver, &mut found);
        if found.is_empty() {
            return 0;
        }

        let mut urls = self.urls.lock();
        let before = urls.len();
        urls.extend(found);
        urls.len() - before
    }

    pub fn len(&self) -> usize {
        self.urls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.lock().is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.lock().contains(url)
    }

    /// Copy of the current set, in sorted order.
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().iter().cloned().collect()
    }

    /// Drain the set, leaving it empty.
    pub fn take(&self) -> BTreeSet<String> {
        std::mem::take(&mut *self.urls.lock())
    }
}
