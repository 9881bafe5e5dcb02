//! Scan statistics with atomic counters.
//!
//! This module provides [`ScanStats`], the counters workers bump while a scan
//! runs, and [`StatsSnapshot`] for point-in-time views.
//!
//! # Thread Safety
//!
//! All counters use [`AtomicU64`] with [`Relaxed`](std::sync::atomic::Ordering::Relaxed)
//! ordering. The pool join provides the happens-before edge for the final
//! snapshot; intermediate snapshots are informational only.
//!
//! # Examples
//!
//! ```
//! use tdx_scanner::ScanStats;
//!
//! let stats = ScanStats::new();
//!
//! stats.increment_seen();
//! stats.increment_indexed();
//! stats.increment_reused();
//!
//! let snapshot = stats.snapshot();
//! assert_eq!(snapshot.fresh(), 0);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters for one scan run.
#[derive(Debug, Default)]
pub struct ScanStats {
    /// Candidates handed to the worker pool.
    seen: AtomicU64,
    /// Entries produced (fresh or reused).
    indexed: AtomicU64,
    /// Entries carried over from the previous manifest.
    reused: AtomicU64,
    /// Candidates that ended up as failure records.
    failed: AtomicU64,
}

impl ScanStats {
    /// Creates a new [`ScanStats`] with all counters at zero.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the candidates counter.
    #[inline]
    pub fn increment_seen(&self) {
        self.seen.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the indexed counter.
    #[inline]
    pub fn increment_indexed(&self) {
        self.indexed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the reused counter.
    #[inline]
    pub fn increment_reused(&self) {
        self.reused.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the failed counter.
    #[inline]
    pub fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time snapshot of all counters.
    ///
    /// # Examples
    ///
    /// ```
    /// use tdx_scanner::ScanStats;
    ///
    /// let stats = ScanStats::new();
    /// stats.increment_seen();
    /// stats.increment_failed();
    ///
    /// let snap = stats.snapshot();
    /// assert_eq!(snap.seen, 1);
    /// assert_eq!(snap.failed, 1);
    /// ```
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            seen: self.seen.load(Ordering::Relaxed),
            indexed: self.indexed.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    /// Resets all counters to zero.
    pub fn reset(&self) {
        self.seen.store(0, Ordering::Relaxed);
        self.indexed.store(0, Ordering::Relaxed);
        self.reused.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time copy of [`ScanStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Candidates handed to the worker pool.
    pub seen: u64,
    /// Entries produced (fresh or reused).
    pub indexed: u64,
    /// Entries carried over from the previous manifest.
    pub reused: u64,
    /// Candidates that ended up as failure records.
    pub failed: u64,
}

impl StatsSnapshot {
    /// Entries that were read and hashed during this run.
    #[inline]
    #[must_use]
    pub const fn fresh(&self) -> u64 {
        self.indexed.saturating_sub(self.reused)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_stats_new() {
        assert_eq!(ScanStats::new().snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_scan_stats_increment() {
        let stats = ScanStats::new();
        for _ in 0..3 {
            stats.increment_seen();
        }
        stats.increment_indexed();
        stats.increment_indexed();
        stats.increment_reused();
        stats.increment_failed();

        let snap = stats.snapshot();
        assert_eq!(snap.seen, 3);
        assert_eq!(snap.indexed, 2);
        assert_eq!(snap.reused, 1);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.fresh(), 1);
    }

    #[test]
    fn test_scan_stats_reset() {
        let stats = ScanStats::new();
        stats.increment_seen();
        stats.increment_failed();

        stats.reset();

        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_fresh_saturates() {
        let snap = StatsSnapshot {
            seen: 4,
            indexed: 1,
            reused: 2,
            failed: 0,
        };
        assert_eq!(snap.fresh(), 0);
    }

    #[test]
    fn test_concurrent_increments() {
        let stats = ScanStats::new();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..250 {
                        stats.increment_seen();
                    }
                });
            }
        });
        assert_eq!(stats.snapshot().seen, 1_000);
    }
}
