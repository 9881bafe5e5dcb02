//! The `(size, mtime)` fingerprint used to decide whether a file changed.
//!
//! A [`FileKey`] is deliberately cheap: it comes from a single `stat` call and
//! never touches file contents. Two different contents with the same size and
//! the same modification timestamp produce the same key, in which case the
//! previously recorded entry is reused even though the bytes differ. This is
//! an accepted tradeoff of the incremental scan, not something the key tries
//! to prevent.

use std::fmt;
use std::fs::Metadata;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error returned when a serialized file key cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid file key '{0}': expected '<size>-<mtimeMs>'")]
pub struct FileKeyParseError(pub String);

/// A composite `(size, modification time)` fingerprint of a file.
///
/// Serialized as the string `"<size>-<mtimeMs>"`, for example
/// `"10-1700000000123"`.
///
/// The modification time is truncated to whole milliseconds, both when read
/// from metadata and when parsing keys written with a fractional part. Writes
/// landing within the same millisecond without changing the size therefore
/// map to the same key, a slightly wider collision window than a key that
/// kept sub-millisecond precision.
///
/// # Examples
///
/// ```
/// use tdx_core::FileKey;
///
/// let key = FileKey::new(10, 1_700_000_000_123);
/// assert_eq!(key.to_string(), "10-1700000000123");
/// assert_eq!("10-1700000000123".parse::<FileKey>().unwrap(), key);
///
/// // Fractional milliseconds from older producers are truncated.
/// assert_eq!("10-1700000000123.75".parse::<FileKey>().unwrap(), key);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct FileKey {
    /// File size in bytes.
    pub size: u64,
    /// Modification time in whole milliseconds since the Unix epoch.
    pub mtime_ms: i64,
}

impl FileKey {
    /// Creates a key from its parts.
    #[inline]
    #[must_use]
    pub const fn new(size: u64, mtime_ms: i64) -> Self {
        Self { size, mtime_ms }
    }

    /// Computes the key from live filesystem metadata.
    ///
    /// # Errors
    ///
    /// Fails only if the platform cannot report modification times.
    pub fn from_metadata(metadata: &Metadata) -> std::io::Result<Self> {
        let modified = metadata.modified()?;
        Ok(Self::new(metadata.len(), system_time_millis(modified)))
    }

    /// Returns the modification time as a UTC timestamp.
    #[must_use]
    pub fn mtime(&self) -> DateTime<Utc> {
        crate::timestamp::from_millis(self.mtime_ms)
    }
}

/// Converts a [`SystemTime`] into signed milliseconds since the Unix epoch.
fn system_time_millis(at: SystemTime) -> i64 {
    match at.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_millis()).unwrap_or(i64::MAX),
        Err(before) => i64::try_from(before.duration().as_millis()).map_or(i64::MIN, |ms| -ms),
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.size, self.mtime_ms)
    }
}

impl FromStr for FileKey {
    type Err = FileKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FileKeyParseError(s.to_owned());

        // The mtime may itself be negative, so split on the first dash only.
        let (size, mtime) = s.split_once('-').ok_or_else(invalid)?;
        let size = size.parse::<u64>().map_err(|_| invalid())?;
        let mtime_ms = match mtime.parse::<i64>() {
            Ok(ms) => ms,
            Err(_) => parse_fractional_millis(mtime).ok_or_else(invalid)?,
        };

        Ok(Self::new(size, mtime_ms))
    }
}

#[allow(clippy::cast_possible_truncation)] // range checked before the cast
fn parse_fractional_millis(raw: &str) -> Option<i64> {
    let value = raw.parse::<f64>().ok()?;
    #[allow(clippy::cast_precision_loss)]
    let in_range = value.is_finite() && value.abs() < i64::MAX as f64;
    in_range.then(|| value.trunc() as i64)
}

impl From<FileKey> for String {
    fn from(key: FileKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for FileKey {
    type Error = FileKeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
