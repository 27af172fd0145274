//! Persisted digest → URL cache for uploaded images.
//!
//! ## Why a whole-file JSON map?
//!
//! The cache rarely exceeds a few hundred entries, gets read once per run,
//! and benefits from being human-inspectable (delete a line to force a
//! re-upload). A database would add nothing here. Writes go through a temp
//! file plus rename so a crash mid-save never corrupts the existing cache.
//!
//! ## Corruption policy
//!
//! An unreadable or unparsable cache file must not abort the run: it is
//! logged and treated as empty, and the run proceeds as a full cache miss.
//! The worst case is re-uploading images the host already has: annoying,
//! never wrong.
//!
//! Entries are idempotent: a digest maps to at most one URL and an existing
//! entry is never overwritten. Staleness (the host deleting an image) is
//! accepted; revalidation is out of scope.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// In-memory view of the persisted digest → URL mapping.
#[derive(Debug)]
pub struct UploadCache {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl UploadCache {
    /// Load the cache from `path`.
    ///
    /// A missing file is a normal first run. A file that exists but cannot
    /// be read or parsed degrades to an empty cache with a warning.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(map) => {
                    debug!("Cache loaded with {} entries from {}", map.len(), path.display());
                    map
                }
                Err(e) => {
                    warn!(
                        "Cache file {} is unparsable ({}); starting with an empty cache",
                        path.display(),
                        e
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No cache file at {}; starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => {
                warn!(
                    "Cache file {} is unreadable ({}); starting with an empty cache",
                    path.display(),
                    e
                );
                BTreeMap::new()
            }
        };

        Self { path, entries }
    }

    /// Look up the remote URL for a content digest.
    pub fn get(&self, digest: &str) -> Option<&str> {
        self.entries.get(digest).map(String::as_str)
    }

    /// Record a digest → URL entry. First write wins: an existing entry is
    /// never overwritten, keeping the cache idempotent across runs.
    pub fn insert(&mut self, digest: impl Into<String>, url: impl Into<String>) {
        self.entries.entry(digest.into()).or_insert_with(|| url.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Persist the full map as pretty-printed JSON.
    ///
    /// Atomic write (temp file + rename) so an interrupted save leaves the
    /// previous cache intact. Save failures are warned, not fatal: losing
    /// cache entries costs a future re-upload, not correctness.
    pub fn save(&self) {
        if let Err(e) = self.try_save() {
            warn!("Could not save cache to {}: {}", self.path.display(), e);
        }
    }

    fn try_save(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        let tmp = tmp_path(&self.path);
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = UploadCache::load(dir.path().join("nope.json"));
        assert!(cache.is_empty());
    }

    #[test]
    fn corrupt_file_is_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{ not json at all").unwrap();

        let cache = UploadCache::load(&path);
        assert!(cache.is_empty());
    }

    #[test]
    fn save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut cache = UploadCache::load(&path);
        cache.insert("abc123", "https://i.example/x.png");
        cache.save();

        let reloaded = UploadCache::load(&path);
        assert_eq!(reloaded.get("abc123"), Some("https://i.example/x.png"));
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn first_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = UploadCache::load(dir.path().join("cache.json"));
        cache.insert("d", "https://first.example/a.png");
        cache.insert("d", "https://second.example/b.png");
        assert_eq!(cache.get("d"), Some("https://first.example/a.png"));
    }

    #[test]
    fn saved_file_is_plain_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let mut cache = UploadCache::load(&path);
        cache.insert("deadbeef", "https://i.example/y.png");
        cache.save();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: BTreeMap<String, String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["deadbeef"], "https://i.example/y.png");
    }
}
