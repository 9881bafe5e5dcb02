//! Domain types for the textdex manifest.
//!
//! # Module Organization
//!
//! - [`entry`] - One indexed document ([`ManifestEntry`]) and its [`Validation`] block
//! - [`file_key`] - The cheap `(size, mtime)` staleness fingerprint
//! - [`manifest`] - The persisted artifact, its statistics, and per-file failures
//!
//! All public types are re-exported at this module level and at the crate root:
//!
//! ```
//! use tdx_core::{FileKey, Manifest, ManifestEntry, ScanFailure};
//! ```

pub mod entry;
pub mod file_key;
pub mod manifest;

pub use entry::{ManifestEntry, Validation};
pub use file_key::{FileKey, FileKeyParseError};
pub use manifest::{MANIFEST_VERSION, Manifest, ManifestStats, ScanFailure};
