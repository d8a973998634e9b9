//! On-disk findings cache
//!
//! JSON at `.doxy/cache.json`, one entry per analyzed file keyed by
//! repo-relative path. Entries carry everything the incremental engine
//! needs to judge validity without re-analysis: the content hash, the
//! authority and repo-context fingerprints, and the exact package versions
//! the file was analyzed against. Unknown keys on the file and on entries
//! are preserved across rewrites so newer doxy versions can add fields
//! without breaking older ones.
//!
//! The cache is rewritten atomically (write to temp, rename) so a crash
//! mid-write can never leave a torn file.

use crate::models::Finding;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CACHE_DIR: &str = ".doxy";
const CACHE_FILE: &str = "cache.json";

/// One analyzed file's record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCacheEntry {
    pub file_path: String,
    /// SHA-256 of the file bytes at analysis time.
    pub content_hash: String,
    pub authority_version: String,
    pub repo_context_hash: String,
    /// Authority-tracked packages the file references. `None` means the
    /// entry was written by a doxy too old to record it; such entries are
    /// always invalid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_packages: Option<Vec<String>>,
    /// Exact resolved versions of those packages at analysis time.
    #[serde(default)]
    pub package_versions: BTreeMap<String, String>,
    /// Import sources that were outside the tracked set.
    #[serde(default)]
    pub unresolved_imports: Vec<String>,
    /// Lines of inline suppression directives that carry no reason, so the
    /// requireSuppressionReason check covers cache-served files too.
    #[serde(default)]
    pub reasonless_suppression_lines: Vec<u32>,
    /// Findings including suppressed ones, so suppression-rule edits apply
    /// without re-analysis.
    #[serde(default)]
    pub findings: Vec<Finding>,
    pub analyzed_at: String,
    /// Forward compatibility: keys written by other versions.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// The whole cache file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CacheFile {
    #[serde(default)]
    pub entries: BTreeMap<String, FileCacheEntry>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub doxy_version: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl CacheFile {
    pub fn path(root: &Path) -> PathBuf {
        root.join(CACHE_DIR).join(CACHE_FILE)
    }

    pub fn new_empty() -> Self {
        Self {
            entries: BTreeMap::new(),
            created_at: Utc::now().to_rfc3339(),
            doxy_version: env!("CARGO_PKG_VERSION").to_string(),
            extra: BTreeMap::new(),
        }
    }

    /// Load the cache if present and parsable. A corrupt cache degrades to
    /// a cold start, never to a failure.
    pub fn load(root: &Path) -> Option<Self> {
        let path = Self::path(root);
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<CacheFile>(&content) {
            Ok(cache) => {
                debug!("loaded cache with {} entries", cache.entries.len());
                Some(cache)
            }
            Err(e) => {
                warn!("discarding unreadable cache {}: {e}", path.display());
                None
            }
        }
    }

    /// Atomically persist the cache.
    pub fn save(&self, root: &Path) -> anyhow::Result<()> {
        use anyhow::Context;

        let path = Self::path(root);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec(self).context("serializing cache")?;
        std::fs::write(&tmp, &json).with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("renaming {} into place", tmp.display()))?;
        debug!("saved cache with {} entries", self.entries.len());
        Ok(())
    }

    /// Whether this cache was written by the running doxy version.
    pub fn same_version(&self) -> bool {
        self.doxy_version == env!("CARGO_PKG_VERSION")
    }
}

/// SHA-256 of a byte slice, lowercase hex.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// SHA-256 of a file's contents, streamed.
pub fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 65536];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
