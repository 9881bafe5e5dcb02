//! Validity cache seeded from the previous manifest.
//!
//! This module provides [`ValidityCache`], a read-only map from `rel_path` to
//! the entry recorded for that path by the last successful run. A scan uses
//! it to skip reading files whose [`FileKey`] has not changed.
//!
//! # Loading policy
//!
//! Loading never fails. A missing manifest (first run) or one that cannot be
//! parsed yields an empty cache, and every file is processed fresh. Items that
//! do not have the expected shape are dropped individually; the rest of the
//! manifest is still used.
//!
//! # Thread Safety
//!
//! The cache is built once before the worker pool starts and never mutated
//! afterwards, so workers read it concurrently through a shared reference
//! without locking.
//!
//! # Examples
//!
//! ```
//! use tdx_core::FileKey;
//! use tdx_scanner::ValidityCache;
//!
//! let cache = ValidityCache::empty();
//! assert!(cache.lookup("notes.md", &FileKey::new(3, 0)).is_none());
//! ```

use camino::Utf8Path;
use serde::Deserialize;
use tdx_core::{FileKey, FxHashMap, Manifest, ManifestEntry, fx_hash_map_with_capacity};

/// Only the part of a prior manifest the cache needs.
#[derive(Debug, Default, Deserialize)]
struct PriorManifest {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

/// Read-only lookup of previously recorded entries keyed by `rel_path`.
#[derive(Debug, Default, Clone)]
pub struct ValidityCache {
    entries: FxHashMap<String, ManifestEntry>,
}

impl ValidityCache {
    /// Creates a cold cache: every lookup misses.
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads the cache from the manifest at `path`.
    ///
    /// Falls back to an empty cache if the file is missing or unreadable.
    #[must_use]
    pub fn load(path: &Utf8Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path, "no previous manifest, starting cold");
                return Self::empty();
            }
            Err(err) => {
                tracing::warn!(path = %path, error = %err, "cannot read previous manifest, starting cold");
                return Self::empty();
            }
        };
        Self::from_json(&raw).unwrap_or_else(|err| {
            tracing::warn!(path = %path, error = %err, "previous manifest is corrupt, starting cold");
            Self::empty()
        })
    }

    /// Builds the cache from serialized manifest text.
    ///
    /// # Errors
    ///
    /// Returns the parse error if `raw` is not a JSON object with an
    /// (optional) `items` array. Malformed items are skipped, not reported.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let prior: PriorManifest = serde_json::from_str(raw)?;
        let total = prior.items.len();
        let entries: Vec<ManifestEntry> = prior
            .items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect();

        if entries.len() < total {
            tracing::debug!(
                dropped = total - entries.len(),
                "skipped malformed entries in previous manifest"
            );
        }
        Ok(Self::from_entries(entries))
    }

    /// Builds the cache from an in-memory manifest.
    #[must_use]
    pub fn from_manifest(manifest: Manifest) -> Self {
        Self::from_entries(manifest.items)
    }

    fn from_entries(items: Vec<ManifestEntry>) -> Self {
        let mut entries = fx_hash_map_with_capacity(items.len());
        for entry in items {
            // First occurrence wins if an older producer wrote duplicates.
            entries.entry(entry.rel_path.clone()).or_insert(entry);
        }
        Self { entries }
    }

    /// Returns the recorded entry for `rel_path` if it is still valid for
    /// the live fingerprint `live`.
    #[must_use]
    pub fn lookup(&self, rel_path: &str, live: &FileKey) -> Option<&ManifestEntry> {
        self.entries
            .get(rel_path)
            .filter(|entry| entry.is_fresh(live))
    }

    /// Returns the number of recorded entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the cache holds no entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
