//! Core types, errors, and utilities for the textdex document indexer.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - Manifest domain types ([`Manifest`], [`ManifestEntry`], [`FileKey`], [`ScanFailure`])
//! - Configuration structures ([`Config`], [`ScanConfig`], [`ServeConfig`])
//! - Error types for consistent error handling ([`ConfigError`])
//! - ISO-8601 timestamp helpers for manifest fields
//! - An `FxHashMap` alias for path-keyed maps

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
pub mod timestamp;
pub mod types;

pub use config::{
    Config, DEFAULT_MAX_BYTES, MAX_AUTO_CONCURRENCY, MIN_AUTO_CONCURRENCY, ScanConfig,
    ServeConfig,
};
pub use error::ConfigError;
pub use hash::{FxBuildHasher, FxHashMap, fx_hash_map_with_capacity};
pub use types::{
    FileKey, FileKeyParseError, MANIFEST_VERSION, Manifest, ManifestEntry, ManifestStats,
    ScanFailure, Validation,
};
