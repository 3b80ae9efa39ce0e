use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

/// Root of the upstream data API.
pub const DEFAULT_API_BASE: &str = "https://api.hakush.in/ww/data/";

/// Root of the upstream asset host.
pub const DEFAULT_ASSET_BASE: &str = "https://api.hakush.in/ww/";

/// Engine project-root marker stripped from asset paths before they are mapped onto the asset host.
pub const ENGINE_ASSET_ROOT: &str = "/Game/Aki/";

/// Extension every resolved asset is requested with.
pub const ASSET_EXTENSION: &str = "webp";

pub const DEFAULT_LANGUAGES: [&str; 4] = ["zh", "en", "ja", "ko"];

/// Language used for the language-qualified index request.
pub const DEFAULT_INDEX_LANGUAGE: &str = "en";

pub const DEFAULT_OUTPUT_DIR: &str = "./ww_data";

/// Maximum number of simultaneous network operations across the whole run.
pub const DEFAULT_MAX_CONCURRENCY: usize = 15;

/// Per-attempt request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_JSON_RETRY_DELAY_MS: u64 = 500;
pub const DEFAULT_DOWNLOAD_RETRY_DELAY_MS: u64 = 1000;

/// Category whose detail pages are often missing upstream; 404s there are not reported.
pub const SPARSE_DETAIL_CATEGORY: &str = "item";

pub const INDEX_FILE_NAME: &str = "index.json";
pub const ASSETS_DIR_NAME: &str = "assets";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const DEFAULT_REFERER: &str = "https://hakush.in/";

/// A top-level dataset partition: where its index lives and where its detail pages live.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
    /// Directory name under the output root.
    pub name: String,
    /// Index file name relative to the API root, e.g. `character.json`.
    pub index_file: String,
    /// Path segment between the language and the identifier in detail URLs.
    pub detail_prefix: String,
}

impl Category {
    pub fn new(name: &str, index_file: &str, detail_prefix: &str) -> Self {
        Self {
            name: name.to_string(),
            index_file: index_file.to_string(),
            detail_prefix: detail_prefix.to_string(),
        }
    }

    /// Whether a 404 on this category's detail pages is expected and should stay quiet.
    pub fn ignores_missing_details(&self) -> bool {
        self.name == SPARSE_DETAIL_CATEGORY
    }
}

/// The categories harvested when no explicit list is configured.
pub fn default_categories() -> Vec<Category> {
    ["character", "weapon", "echo", "item"]
        .iter()
        .map(|name| Category::new(name, &format!("{}.json", name), name))
        .collect()
}

/// Attempt ceiling and fixed delays shared by JSON fetches and binary downloads.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub json_delay_ms: u64,
    pub download_delay_ms: u64,
}

impl RetryPolicy {
    pub fn json_delay(&self) -> Duration {
        Duration::from_millis(self.json_delay_ms)
    }

    pub fn download_delay(&self) -> Duration {
        Duration::from_millis(self.download_delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            json_delay_ms: DEFAULT_JSON_RETRY_DELAY_MS,
            download_delay_ms: DEFAULT_DOWNLOAD_RETRY_DELAY_MS,
        }
    }
}

/// Top-level configuration for a harvest run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Root of the on-disk tree.
    pub output_dir: PathBuf,
    /// Languages fetched for every detail record, in order.
    pub languages: Vec<String>,
    /// Language tried first when fetching a category index.
    pub index_language: String,
    /// Ignore cached artifacts and fetch everything again.
    pub force: bool,
    pub categories: Vec<Category>,
    pub api_base: String,
    pub asset_base: String,
    /// Size of the shared permit pool.
    pub max_concurrency: usize,
    pub request_timeout_secs: u64,
    /// Default headers sent with every request.
    pub headers: HashMap<String, String>,
    pub retry: RetryPolicy,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        let headers = HashMap::from([
            ("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string()),
            ("Referer".to_string(), DEFAULT_REFERER.to_string()),
        ]);
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            languages: DEFAULT_LANGUAGES.iter().map(|l| l.to_string()).collect(),
            index_language: DEFAULT_INDEX_LANGUAGE.to_string(),
            force: false,
            categories: default_categories(),
            api_base: DEFAULT_API_BASE.to_string(),
            asset_base: DEFAULT_ASSET_BASE.to_string(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            headers,
            retry: RetryPolicy::default(),
        }
    }
}

impl HarvestConfig {
    /// Load settings from a JSON file. Fields absent from the file keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(anyhow!("max_concurrency must be > 0"));
        }
        if self.retry.max_attempts == 0 {
            return Err(anyhow!("retry.max_attempts must be > 0"));
        }
        if self.languages.is_empty() {
            return Err(anyhow!("at least one language must be configured"));
        }
        if let Some(pos) = self.languages.iter().position(|l| l.trim().is_empty()) {
            return Err(anyhow!("languages[{}] is blank", pos));
        }
        Ok(())
    }
}
