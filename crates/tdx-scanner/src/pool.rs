//! Bounded worker pool.
//!
//! [`WorkerPool`] owns a dedicated rayon thread pool sized to the configured
//! concurrency. Candidates are distributed by rayon's work stealing; each
//! worker pushes its outcome into one of two mutex-guarded collections and
//! bumps the shared [`ScanStats`]. `run` returns only after every candidate
//! has been processed.
//!
//! The counts that end up in a manifest come from [`PoolOutput`], which
//! belongs to a single run. [`ScanStats`] may be shared by several scanners
//! and is only read for progress and logging.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rayon::prelude::*;
use tdx_core::{ManifestEntry, ScanFailure};

use crate::cache::ValidityCache;
use crate::error::ScanError;
use crate::processor::{ContentProcessor, Outcome};
use crate::stats::ScanStats;
use crate::walker::WalkedFile;

/// Everything the pool produced for one run, in completion order.
#[derive(Debug, Default)]
pub struct PoolOutput {
    /// Fresh and reused entries.
    pub entries: Vec<ManifestEntry>,
    /// Per-file failures.
    pub failures: Vec<ScanFailure>,
    /// How many of `entries` were reused from the validity cache.
    pub reused: u64,
}

/// A fixed-size pool of scan workers.
#[derive(Debug)]
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl WorkerPool {
    /// Starts a pool with `workers` threads (at least one).
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::ThreadPool`] if the threads cannot be spawned.
    pub fn new(workers: usize) -> Result<Self, ScanError> {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("tdx-worker-{index}"))
            .build()?;
        Ok(Self { pool, workers })
    }

    /// Returns the number of worker threads.
    #[inline]
    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Processes every candidate exactly once and joins.
    ///
    /// One file's failure never affects another's outcome.
    #[must_use]
    pub fn run(
        &self,
        files: &[WalkedFile],
        processor: &ContentProcessor,
        cache: &ValidityCache,
        stats: &ScanStats,
    ) -> PoolOutput {
        let entries = Mutex::new(Vec::with_capacity(files.len()));
        // Failures are rare, so contention on this lock is minimal.
        let failures = Mutex::new(Vec::new());
        let reused = AtomicU64::new(0);

        self.pool.install(|| {
            files.par_iter().for_each(|file| {
                stats.increment_seen();
                match processor.process(file, cache) {
                    Outcome::Indexed(entry) => {
                        stats.increment_indexed();
                        entries.lock().push(entry);
                    }
                    Outcome::Reused(entry) => {
                        reused.fetch_add(1, Ordering::Relaxed);
                        stats.increment_indexed();
                        stats.increment_reused();
                        entries.lock().push(entry);
                    }
                    Outcome::Failed(failure) => {
                        stats.increment_failed();
                        failures.lock().push(failure);
                    }
                }
            });
        });

        PoolOutput {
            entries: entries.into_inner(),
            failures: failures.into_inner(),
            reused: reused.into_inner(),
        }
    }
}
