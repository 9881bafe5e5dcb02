//! Error types for the tdx-scanner crate.
//!
//! Two layers:
//!
//! - [`FileError`] describes why a single file (or directory) could not be
//!   indexed. It is always recoverable: the worker converts it into a
//!   [`ScanFailure`] record and moves on to the next file.
//! - [`ScanError`] is fatal to the whole run: invalid configuration, a worker
//!   pool that cannot be built, or a manifest that cannot be persisted.
//!
//! # Error Recovery Strategy
//!
//! - **Oversize** ([`FileError::Oversize`]): record, skip file, continue scan
//! - **Metadata / read** ([`FileError::Metadata`], [`FileError::Read`]): record, skip file, continue scan
//! - **Walk** ([`FileError::Walk`]): record, skip subtree, continue scan
//! - **Persist** ([`ScanError::Persist`]): fatal - surfaced to the invoker
//! - **Load / parse** ([`ScanError::Load`], [`ScanError::Parse`]): only raised
//!   when a caller explicitly reads a manifest; a scan treats an unreadable
//!   previous manifest as an empty cache instead
//!
//! # Examples
//!
//! ```
//! use tdx_scanner::FileError;
//!
//! let err = FileError::Oversize { size: 11, limit: 10 };
//! let failure = err.into_failure("notes/big.txt");
//! assert_eq!(failure.rel_path, "notes/big.txt");
//! assert!(failure.reason.contains("10 bytes"));
//! ```

use std::path::PathBuf;

use camino::Utf8PathBuf;
use tdx_core::{ConfigError, ScanFailure};

/// Per-file failures. Never abort a scan.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// The file is larger than the configured ceiling. The file is not read.
    #[error("exceeds {limit} bytes (file is {size} bytes)")]
    Oversize {
        /// Actual size in bytes.
        size: u64,
        /// Configured ceiling in bytes.
        limit: u64,
    },

    /// The file could not be stat'ed (e.g. it disappeared after listing).
    #[error("failed to read metadata: {0}")]
    Metadata(#[source] std::io::Error),

    /// The file contents could not be read.
    #[error("failed to read file: {0}")]
    Read(#[source] std::io::Error),

    /// A directory or entry could not be listed during the walk.
    #[error("failed to walk directory: {0}")]
    Walk(String),

    /// A path is not valid UTF-8 and cannot be keyed in the manifest.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(PathBuf),
}

impl FileError {
    /// Returns `true` for a size-ceiling rejection.
    #[inline]
    #[must_use]
    pub const fn is_oversize(&self) -> bool {
        matches!(self, Self::Oversize { .. })
    }

    /// Converts this error into the manifest record for `rel_path`.
    #[must_use]
    pub fn into_failure(self, rel_path: impl Into<String>) -> ScanFailure {
        ScanFailure::new(rel_path, self.to_string())
    }
}

impl From<ignore::Error> for FileError {
    fn from(err: ignore::Error) -> Self {
        Self::Walk(err.to_string())
    }
}

/// Errors that end a scan run.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Invalid scanner configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Configuration failed validation.
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    /// The worker pool could not be started.
    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// The manifest could not be serialized.
    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The manifest could not be written to its output location.
    #[error("failed to persist manifest to {path}: {source}")]
    Persist {
        /// The output path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An existing manifest could not be read.
    #[error("failed to read manifest {path}: {source}")]
    Load {
        /// The manifest path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An existing manifest is not valid manifest JSON.
    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        /// The manifest path.
        path: Utf8PathBuf,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

impl ScanError {
    /// Creates a new [`ScanError::Config`] error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a new [`ScanError::Persist`] error.
    #[inline]
    pub fn persist(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Persist {
            path: path.into(),
            source,
        }
    }

    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::Persist { path, .. } | Self::Load { path, .. } | Self::Parse { path, .. } => {
                Some(path)
            }
            Self::Config(_)
            | Self::InvalidConfig(_)
            | Self::ThreadPool(_)
            | Self::Serialize(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_oversize_reason_names_limit() {
        let err = FileError::Oversize {
            size: 5_242_881,
            limit: 5_242_880,
        };
        assert!(err.is_oversize());
        assert_eq!(
            err.to_string(),
            "exceeds 5242880 bytes (file is 5242881 bytes)"
        );
    }

    #[test]
    fn test_read_error_keeps_underlying_message() {
        let err = FileError::Read(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        assert!(!err.is_oversize());
        let failure = err.into_failure("a.txt");
        assert_eq!(failure.reason, "failed to read file: denied");
    }

    #[test]
    fn test_metadata_error_display() {
        let err = FileError::Metadata(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_scan_error_persist() {
        let err = ScanError::persist(
            "out/index.json",
            io::Error::new(io::ErrorKind::StorageFull, "disk full"),
        );
        assert_eq!(err.path().map(|p| p.as_str()), Some("out/index.json"));
        assert!(err.to_string().contains("out/index.json"));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_scan_error_display() {
        let err = ScanError::config("root path does not exist: /nope");
        assert_eq!(
            err.to_string(),
            "invalid configuration: root path does not exist: /nope"
        );
        assert!(err.path().is_none());
    }

    #[test]
    fn test_invalid_config_is_transparent() {
        let err = ScanError::from(ConfigError::invalid_option("max_bytes", "zero"));
        assert_eq!(
            err.to_string(),
            "invalid configuration option 'max_bytes': zero"
        );
    }
}
