// On-disk artifact cache — layout, presence checks and atomic staged writes.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::config::{ASSETS_DIR_NAME, INDEX_FILE_NAME};

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// Outcome of a best-effort cache read. Any read or parse problem is a miss.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheRead {
    Hit(Value),
    Miss,
}

pub struct CacheStore {
    root: PathBuf,
    force: bool,
}

impl CacheStore {
    /// `force` makes every artifact count as absent, so everything is fetched again.
    pub fn new(root: impl Into<PathBuf>, force: bool) -> Self {
        Self {
            root: root.into(),
            force,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn force(&self) -> bool {
        self.force
    }

    pub fn index_path(&self, category: &str) -> PathBuf {
        self.root.join(category).join(INDEX_FILE_NAME)
    }

    pub fn detail_path(&self, category: &str, lang: &str, id: &str) -> PathBuf {
        self.root
            .join(category)
            .join(lang)
            .join(format!("{}.json", id))
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join(ASSETS_DIR_NAME)
    }

    pub fn asset_path(&self, file_name: &str) -> PathBuf {
        self.assets_dir().join(file_name)
    }

    /// A regular, non-empty file at `path` is a complete artifact.
    pub async fn is_cached(&self, path: &Path) -> bool {
        if self.force {
            return false;
        }
        matches!(fs::metadata(path).await, Ok(meta) if meta.is_file() && meta.len() > 0)
    }

    pub async fn read_cached(&self, path: &Path) -> CacheRead {
        if !self.is_cached(path).await {
            return CacheRead::Miss;
        }

        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("cache read {} failed: {}", path.display(), e);
                return CacheRead::Miss;
            }
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Null) => CacheRead::Miss,
            Ok(value) => CacheRead::Hit(value),
            Err(e) => {
                debug!("cached {} is not valid json, refetching: {}", path.display(), e);
                CacheRead::Miss
            }
        }
    }

    /// A unique hidden sibling of `dest` to write into before promotion.
    pub fn stage(&self, dest: &Path) -> PathBuf {
        let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        dest.with_file_name(format!(".{}.{}.{}.part", name, std::process::id(), seq))
    }

    /// Move a fully written staging file onto its final path.
    pub async fn promote(&self, staging: &Path, dest: &Path) -> Result<()> {
        if let Err(e) = fs::rename(staging, dest).await {
            self.discard(staging).await;
            return Err(e).with_context(|| format!("renaming into {}", dest.display()));
        }
        Ok(())
    }

    pub async fn discard(&self, staging: &Path) {
        let _ = fs::remove_file(staging).await;
    }

    pub async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let staging = self.stage(path);
        if let Err(e) = write_synced(&staging, bytes).await {
            self.discard(&staging).await;
            return Err(e).with_context(|| format!("writing {}", staging.display()));
        }
        self.promote(&staging, path).await
    }

    /// Pretty-printed, key order preserved.
    pub async fn write_atomic_json(&self, path: &Path, value: &Value) -> Result<()> {
        let body = serde_json::to_vec_pretty(value)?;
        self.write_atomic(path, &body).await
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}
