//! The persisted manifest and its parts.
//!
//! A [`Manifest`] is the only artifact a scan produces. Each run rebuilds it
//! from scratch (reusing unchanged entries from the previous one) and replaces
//! the file wholesale. Field names and nesting are the contract with downstream
//! consumers and must not change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entry::ManifestEntry;

/// Current manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

/// A file that could not be indexed, with a human-readable reason.
///
/// One record per failed or rejected file (or unreadable directory). A
/// failure never stops the scan.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanFailure {
    /// Path relative to the scan root.
    pub rel_path: String,
    /// Why the file was not indexed.
    pub reason: String,
}

impl ScanFailure {
    /// Creates a failure record.
    #[must_use]
    pub fn new(rel_path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            rel_path: rel_path.into(),
            reason: reason.into(),
        }
    }
}

/// Aggregate counts for one run.
///
/// `indexed` always equals the number of items and `failed` the number of
/// errors; `reused` counts the items carried over from the previous manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestStats {
    /// Eligible files discovered by the walk.
    pub total_files_seen: u64,
    /// Entries in the manifest.
    pub indexed: u64,
    /// Entries reused without re-reading the file.
    pub reused: u64,
    /// Failure records in the manifest.
    pub failed: u64,
    /// Size ceiling in effect for the run.
    pub max_bytes: u64,
    /// Worker count used for the run.
    pub concurrency: usize,
}

/// The persisted index of all eligible documents under a root.
///
/// # Examples
///
/// ```
/// use tdx_core::{Manifest, ManifestStats, MANIFEST_VERSION};
///
/// let manifest = Manifest {
///     version: MANIFEST_VERSION,
///     generated_at: chrono::Utc::now(),
///     base_dir: "texts".to_owned(),
///     items: Vec::new(),
///     stats: ManifestStats::default(),
///     errors: Vec::new(),
/// };
///
/// assert!(manifest.find("missing.md").is_none());
/// assert!(manifest.is_consistent());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Format version, currently [`MANIFEST_VERSION`].
    pub version: u32,

    /// When the manifest was assembled.
    #[serde(with = "crate::timestamp")]
    pub generated_at: DateTime<Utc>,

    /// Scan root relative to the invocation working directory.
    pub base_dir: String,

    /// Entries sorted ascending by `rel_path`.
    pub items: Vec<ManifestEntry>,

    /// Aggregate counts.
    pub stats: ManifestStats,

    /// Files that could not be indexed.
    pub errors: Vec<ScanFailure>,
}

impl Manifest {
    /// Looks up an entry by relative path.
    ///
    /// Relies on `items` being sorted, which every assembled manifest is.
    #[must_use]
    pub fn find(&self, rel_path: &str) -> Option<&ManifestEntry> {
        self.items
            .binary_search_by(|entry| entry.rel_path.as_str().cmp(rel_path))
            .ok()
            .and_then(|index| self.items.get(index))
    }

    /// Checks the structural invariants: items strictly ascending by path
    /// (hence unique), and counts matching the collections.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let sorted = self
            .items
            .windows(2)
            .all(|pair| pair[0].rel_path < pair[1].rel_path);

        sorted
            && self.stats.indexed == self.items.len() as u64
            && self.stats.failed == self.errors.len() as u64
            && self.stats.reused <= self.stats.indexed
    }
}
