// Engine asset path → asset host URL mapping.

use serde_json::Value;

use crate::config::{ASSET_EXTENSION, ENGINE_ASSET_ROOT};

/// Maps internal engine asset paths onto URLs under a fixed asset base.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    base: String,
}

impl AssetResolver {
    pub fn new(base: &str) -> Self {
        let mut base = base.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Self { base }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Resolve an engine path such as
    /// `/Game/Aki/UI/UIResources/Common/Image/IconA/T_IconA.T_IconA`
    /// to `{base}UI/UIResources/Common/Image/IconA/T_IconA.webp`.
    ///
    /// Returns `None` when the input is empty, has no path separator once the
    /// engine root is removed, or contains a `.` / `..` segment. The relative
    /// path is appended literally, so scheme-like prefixes stay under the base.
    pub fn resolve(&self, game_path: &str) -> Option<String> {
        if game_path.is_empty() {
            return None;
        }

        let relative = game_path.replace(ENGINE_ASSET_ROOT, "/");
        if !relative.contains('/') {
            return None;
        }

        if relative.split(['/', '\\']).any(is_dot_segment) {
            return None;
        }

        // The asset host serves webp regardless of the source extension, so
        // .png / .jpg sources are requested as .webp too.
        let stem = strip_extension(&relative);
        Some(format!(
            "{}{}.{}",
            self.base,
            stem.trim_start_matches('/'),
            ASSET_EXTENSION
        ))
    }

    /// Like [`resolve`](Self::resolve), but rejects any non-string JSON value.
    pub fn resolve_value(&self, value: &Value) -> Option<String> {
        value.as_str().and_then(|s| self.resolve(s))
    }
}

/// `.` and `..`, including percent-encoded spellings, which URL parsers collapse
/// and which would move the request outside the asset base.
fn is_dot_segment(segment: &str) -> bool {
    let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
    decoded == "." || decoded == ".."
}

/// Drop everything from the first `.` of the final segment that is followed by at least one character.
fn strip_extension(path: &str) -> &str {
    let segment_start = path.rfind('/').map_or(0, |i| i + 1);
    let segment = &path[segment_start..];
    match segment
        .char_indices()
        .find(|&(i, c)| c == '.' && i + 1 < segment.len())
    {
        Some((dot, _)) => &path[..segment_start + dot],
        None => path,
    }
}
