//! Incremental, concurrent scanner that builds the textdex manifest.
//!
//! This crate walks a root directory, keeps the files whose extension is
//! allowed, and turns each of them into a manifest entry, reusing the entry
//! from the previous manifest when the file's `(size, mtime)` fingerprint is
//! unchanged. Results are sorted and written atomically as JSON.
//!
//! # Overview
//!
//! The main entry point is [`Scanner`], which combines:
//!
//! - [`FileWalker`]: Directory traversal with skip-and-report error handling
//! - [`FileFilter`] / [`ExtensionFilter`]: Candidate eligibility
//! - [`ValidityCache`]: Read-only lookup of the previous run's entries
//! - [`ContentProcessor`]: Reuse-or-reprocess logic for a single file
//! - [`WorkerPool`]: Bounded rayon pool with per-file error isolation
//! - [`ManifestAssembler`]: Deterministic ordering and statistics
//! - [`write_manifest`]: Atomic persistence
//!
//! # Example
//!
//! ```no_run
//! use tdx_core::ScanConfig;
//! use tdx_scanner::Scanner;
//! use camino::Utf8Path;
//!
//! let scanner = Scanner::new(ScanConfig::new(Utf8Path::new("./texts")))?;
//! let (manifest, summary) = scanner.run()?;
//!
//! println!("Indexed: {} | Reused: {} | Failed: {}", summary.indexed, summary.reused, summary.failed);
//! assert_eq!(manifest.items.len() as u64, summary.indexed);
//! # Ok::<(), tdx_scanner::ScanError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! Scanner::run
//!     │
//!     ├── ValidityCache::load (previous manifest, or cold)
//!     │
//!     ├── FileWalker::walk ──► ExtensionFilter
//!     │
//!     ├── WorkerPool::run (rayon, N threads)
//!     │       │
//!     │       └── ContentProcessor::process ──► Indexed | Reused | Failed
//!     │
//!     ├── ManifestAssembler::assemble (sort, count)
//!     │
//!     └── write_manifest (temp file + rename)
//! ```
//!
//! # Concurrency
//!
//! - **Cache**: built before the pool starts, read without locks
//! - **Results**: two `parking_lot::Mutex<Vec<_>>` collections
//! - **Counters**: atomics in [`ScanStats`]
//! - **Ordering**: none among workers; the assembler imposes total order

#![deny(clippy::all)]
#![warn(missing_docs)]

mod assembler;
mod cache;
mod error;
mod filter;
mod persist;
mod pool;
mod processor;
mod stats;
mod walker;

pub use assembler::{ManifestAssembler, ScanResults};
pub use cache::ValidityCache;
pub use error::{FileError, ScanError};
pub use filter::{ExtensionFilter, FileFilter};
pub use persist::{read_manifest, write_manifest};
pub use pool::{PoolOutput, WorkerPool};
pub use processor::{ContentProcessor, Outcome, content_hash, normalize_text};
pub use stats::{ScanStats, StatsSnapshot};
pub use walker::{FileWalker, WalkOutcome, WalkedFile};

use std::fmt;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, SubsecRound, Utc};
use tdx_core::{ConfigError, Manifest, ScanConfig};
use tracing::{debug, info};

/// Counts reported after a scan-and-persist cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    /// Entries in the manifest.
    pub indexed: u64,
    /// Entries reused from the previous manifest.
    pub reused: u64,
    /// Failure records in the manifest.
    pub failed: u64,
    /// Manifest timestamp.
    pub generated_at: DateTime<Utc>,
    /// Where the manifest was written.
    pub output_path: Utf8PathBuf,
}

impl ScanSummary {
    /// Summarizes a manifest persisted at `output_path`.
    #[must_use]
    pub fn from_manifest(manifest: &Manifest, output_path: &Utf8Path) -> Self {
        Self {
            indexed: manifest.stats.indexed,
            reused: manifest.stats.reused,
            failed: manifest.stats.failed,
            generated_at: manifest.generated_at,
            output_path: output_path.to_owned(),
        }
    }
}

/// The main scanner.
///
/// A scanner is built once from a [`ScanConfig`] and can run any number of
/// cycles; each cycle re-reads the manifest it last wrote as its cache seed.
///
/// # Cloning
///
/// `Scanner` is cheaply cloneable via internal `Arc` references. Clones
/// share the worker pool, the filter and the statistics counters. Clones may
/// scan at the same time: manifest counts are derived per run, so only
/// [`stats`](Self::stats) reflects the interleaving.
#[derive(Clone)]
pub struct Scanner {
    /// Scanner configuration.
    config: ScanConfig,
    /// Candidate eligibility.
    filter: Arc<dyn FileFilter>,
    /// Worker threads (shared via Arc for cloning).
    pool: Arc<WorkerPool>,
    /// Statistics counters (shared via Arc for cloning).
    stats: Arc<ScanStats>,
}

impl fmt::Debug for Scanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scanner")
            .field("config", &self.config)
            .field("workers", &self.pool.workers())
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}

impl Scanner {
    /// Creates a new scanner with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidConfig`] if the configuration fails
    /// validation or the root is not a directory, and
    /// [`ScanError::ThreadPool`] if the workers cannot be started.
    pub fn new(config: ScanConfig) -> Result<Self, ScanError> {
        config.validate()?;

        if !config.root_path.is_dir() {
            return Err(ConfigError::MissingDirectory(config.root_path.clone()).into());
        }

        let pool = WorkerPool::new(config.effective_concurrency())?;
        let filter = ExtensionFilter::from_config(&config);

        info!(
            root = %config.root_path,
            output = %config.output_path,
            workers = pool.workers(),
            extensions = ?filter.extensions(),
            "Creating scanner"
        );

        Ok(Self {
            config,
            filter: Arc::new(filter),
            pool: Arc::new(pool),
            stats: Arc::new(ScanStats::new()),
        })
    }

    /// Replaces the eligibility filter derived from the configuration.
    #[must_use]
    pub fn with_filter(mut self, filter: impl FileFilter) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    /// Builds a manifest without writing it.
    ///
    /// The previous manifest at the configured output path, if any, seeds
    /// the validity cache.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Config`] if the root has disappeared since the
    /// scanner was created. Per-file problems never fail a scan; they are
    /// recorded in [`Manifest::errors`].
    pub fn scan(&self) -> Result<Manifest, ScanError> {
        info!(root = %self.config.root_path, "Starting scan");
        self.stats.reset();

        let cache = ValidityCache::load(&self.config.output_path);
        debug!(entries = cache.len(), "Loaded validity cache");

        let walker = self.build_walker()?;
        let walked = walker.walk(self.filter.as_ref());
        info!(count = walked.files.len(), "Collected candidate files");

        let processor = ContentProcessor::new(self.config.max_bytes);
        let output = self
            .pool
            .run(&walked.files, &processor, &cache, &self.stats);

        let mut failures = output.failures;
        failures.extend(walked.failures);

        let results = ScanResults {
            entries: output.entries,
            failures,
            total_files_seen: walked.files.len() as u64,
            reused: output.reused,
        };
        let assembler = ManifestAssembler::new(
            base_dir(&self.config.root_path),
            self.config.max_bytes,
            self.pool.workers(),
        );
        // Millisecond precision, matching what the manifest can represent.
        let manifest = assembler.assemble(results, Utc::now().trunc_subsecs(3));

        let stats = self.stats.snapshot();
        info!(
            seen = manifest.stats.total_files_seen,
            indexed = manifest.stats.indexed,
            reused = manifest.stats.reused,
            fresh = stats.fresh(),
            failed = manifest.stats.failed,
            "Scan completed"
        );

        Ok(manifest)
    }

    /// Performs one full scan-and-persist cycle.
    ///
    /// # Errors
    ///
    /// Everything [`scan`](Self::scan) returns, plus [`ScanError::Persist`]
    /// if the manifest cannot be written.
    pub fn run(&self) -> Result<(Manifest, ScanSummary), ScanError> {
        let manifest = self.scan()?;
        write_manifest(&self.config.output_path, &manifest)?;
        let summary = ScanSummary::from_manifest(&manifest, &self.config.output_path);
        info!(path = %summary.output_path, "Manifest written");
        Ok((manifest, summary))
    }

    /// Returns a snapshot of the counters of the current or last run.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Returns the scanner configuration.
    #[must_use]
    pub const fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Builds a file walker with the current configuration.
    fn build_walker(&self) -> Result<FileWalker, ScanError> {
        Ok(FileWalker::new(&self.config.root_path)?
            .with_follow_links(self.config.follow_links)
            .with_excluded(&self.config.output_path))
    }
}

/// Expresses the scan root relative to the working directory.
///
/// Empty when they coincide; the root as given when either side cannot be
/// resolved or they share no common prefix.
fn base_dir(root: &Utf8Path) -> String {
    let resolved = std::env::current_dir()
        .ok()
        .and_then(|cwd| Utf8PathBuf::from_path_buf(cwd).ok())
        .and_then(|cwd| cwd.canonicalize_utf8().ok())
        .zip(root.canonicalize_utf8().ok());

    resolved
        .and_then(|(cwd, root_abs)| relative_path(&cwd, &root_abs))
        .unwrap_or_else(|| root.to_string())
}

/// Computes the `/`-separated path leading from `from` to `to`.
fn relative_path(from: &Utf8Path, to: &Utf8Path) -> Option<String> {
    let from: Vec<_> = from.components().collect();
    let to: Vec<_> = to.components().collect();
    if from.first() != to.first() {
        return None;
    }

    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();
    let parts: Vec<&str> = std::iter::repeat_n("..", from.len() - common)
        .chain(to[common..].iter().map(|component| component.as_str()))
        .collect();
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scanner_invalid_root() {
        let config = ScanConfig::new(Utf8Path::new("/nonexistent/path/that/does/not/exist"));
        let err = Scanner::new(config).unwrap_err();
        assert!(matches!(
            err,
            ScanError::InvalidConfig(ConfigError::MissingDirectory(_))
        ));
    }

    #[test]
    fn test_scanner_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let config = ScanConfig::new(root).with_max_bytes(0);
        assert!(matches!(
            Scanner::new(config).unwrap_err(),
            ScanError::InvalidConfig(_)
        ));
    }

    #[test]
    fn test_scanner_uses_effective_concurrency() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let scanner = Scanner::new(ScanConfig::new(root).with_concurrency(3)).unwrap();
        assert_eq!(scanner.pool.workers(), 3);
        assert!(format!("{scanner:?}").contains("workers: 3"));
    }

    #[test]
    fn test_relative_path() {
        let rel = |from: &str, to: &str| relative_path(Utf8Path::new(from), Utf8Path::new(to));
        assert_eq!(rel("/a/b", "/a/b").as_deref(), Some(""));
        assert_eq!(rel("/a/b", "/a/b/c/d").as_deref(), Some("c/d"));
        assert_eq!(rel("/a/b/c", "/a/x").as_deref(), Some("../../x"));
        assert_eq!(rel("/a", "/").as_deref(), Some(".."));
        assert_eq!(rel("/a", "rel").as_deref(), None);
    }

    #[test]
    fn test_base_dir_falls_back_to_root_as_given() {
        assert_eq!(base_dir(Utf8Path::new("/no/such/root")), "/no/such/root");
    }

    #[test]
    fn test_summary_from_manifest() {
        let manifest = ManifestAssembler::new("", 1, 1).assemble(
            ScanResults {
                failures: vec![tdx_core::ScanFailure::new("x.txt", "boom")],
                ..ScanResults::default()
            },
            tdx_core::timestamp::from_millis(0),
        );
        let summary = ScanSummary::from_manifest(&manifest, Utf8Path::new("out.json"));
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.indexed, 0);
        assert_eq!(summary.output_path, "out.json");
    }
}
