//! Manifest entries: one record per indexed document.
//!
//! An entry is immutable once built. It is either produced fresh by the
//! content processor or carried over unchanged from the previous manifest
//! when its [`FileKey`] still matches the file on disk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::file_key::FileKey;

/// Integrity data attached to every entry.
///
/// `content_hash` is computed over the *raw* file bytes while `content` (and
/// therefore `normalized_length`) describes the normalized text. The two are
/// intentionally derived from different representations.
///
/// Serialized keys are `contentHash`, `fileKey` and `length`. When reading,
/// `sha1` is accepted for `contentHash` and `normalizedLength` for `length`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Validation {
    /// Hex digest of the raw bytes.
    #[serde(rename = "contentHash", alias = "sha1")]
    pub content_hash: String,

    /// Fingerprint of the file at the time the entry was produced.
    #[serde(rename = "fileKey")]
    pub file_key: FileKey,

    /// Length of the normalized text in Unicode scalar values.
    ///
    /// Consumers that measure strings in UTF-16 code units see a larger
    /// value for text outside the Basic Multilingual Plane (one per emoji).
    #[serde(rename = "length", alias = "normalizedLength")]
    pub normalized_length: usize,
}

/// A single indexed document.
///
/// `rel_path` is the unique key of an entry within one manifest and always
/// uses `/` as separator.
///
/// # Examples
///
/// ```
/// use tdx_core::{FileKey, ManifestEntry, Validation};
///
/// let key = FileKey::new(5, 1_700_000_000_000);
/// let entry = ManifestEntry {
///     id: "abc123".to_owned(),
///     name: "hello.txt".to_owned(),
///     rel_path: "greetings/hello.txt".to_owned(),
///     size: 5,
///     mtime: key.mtime(),
///     content: "hello".to_owned(),
///     validation: Validation {
///         content_hash: "abc123".to_owned(),
///         file_key: key,
///         normalized_length: 5,
///     },
/// };
///
/// assert!(entry.is_fresh(&key));
/// assert!(!entry.is_fresh(&FileKey::new(6, 1_700_000_000_000)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    /// Stable identity: the content hash of the raw bytes.
    pub id: String,

    /// Base file name.
    pub name: String,

    /// Path relative to the scan root.
    pub rel_path: String,

    /// File size in bytes.
    pub size: u64,

    /// Last modification time.
    #[serde(with = "crate::timestamp")]
    pub mtime: DateTime<Utc>,

    /// Normalized text content.
    pub content: String,

    /// Integrity data.
    pub validation: Validation,
}

impl ManifestEntry {
    /// Returns `true` if this entry was recorded for a file whose live
    /// fingerprint is `live`, i.e. the entry can be reused without reading
    /// the file.
    #[inline]
    #[must_use]
    pub fn is_fresh(&self, live: &FileKey) -> bool {
        self.validation.file_key == *live
    }
}
