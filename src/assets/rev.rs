//! Content fingerprinting for cache busting.
//!
//! Optimized assets get a content hash in their filename so unchanged
//! content keeps a byte-identical name across builds and changed content
//! busts every cache. The original -> fingerprinted mapping is persisted
//! as `rev-manifest.json` in the build directory.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

/// Length of the hex digest embedded in filenames.
const REV_HASH_LEN: usize = 10;

/// Manifest filename written to the build directory.
pub const REV_MANIFEST_FILENAME: &str = "rev-manifest.json";

/// Compute the filename fingerprint for some content.
pub fn fingerprint(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let digest = hex::encode(hasher.finalize());
    digest[..REV_HASH_LEN].to_string()
}

/// Insert a content fingerprint into a filename.
///
/// `styles/app.css` -> `styles/app-3f2a9bc01d.css`
pub fn fingerprinted_name(name: &str, content: &[u8]) -> String {
    let hash = fingerprint(content);
    let path = Path::new(name);

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(name);
    let renamed = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}-{}.{}", stem, hash, ext),
        None => format!("{}-{}", stem, hash),
    };

    match path.parent() {
        Some(parent) if parent != Path::new("") => {
            format!("{}/{}", parent.to_string_lossy(), renamed)
        }
        _ => renamed,
    }
}

/// Mapping of original asset names to fingerprinted names.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RevManifest(BTreeMap<String, String>);

impl RevManifest {
    /// Create an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fingerprinted asset.
    pub fn record(&mut self, original: impl Into<String>, fingerprinted: impl Into<String>) {
        self.0.insert(original.into(), fingerprinted.into());
    }

    /// Look up the fingerprinted name for an original.
    pub fn get(&self, original: &str) -> Option<&str> {
        self.0.get(original).map(|s| s.as_str())
    }

    /// Number of recorded assets.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the manifest is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Write the manifest into a directory as `rev-manifest.json`.
    pub fn save_to_dir(&self, dir: &Path) -> std::io::Result<std::path::PathBuf> {
        let path = dir.join(REV_MANIFEST_FILENAME);
        let json = serde_json::to_string_pretty(&self.0)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    /// Load a manifest from a directory, if present.
    pub fn load_from_dir(dir: &Path) -> std::io::Result<Option<Self>> {
        let path = dir.join(REV_MANIFEST_FILENAME);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        let map: BTreeMap<String, String> = serde_json::from_str(&contents)?;
        Ok(Some(Self(map)))
    }
}
