//! Deterministic manifest assembly.
//!
//! Workers finish in arbitrary order; [`ManifestAssembler`] is where the
//! output becomes reproducible. It is pure: no I/O and no clock access (the
//! timestamp is passed in).

use chrono::{DateTime, Utc};
use tdx_core::{MANIFEST_VERSION, Manifest, ManifestEntry, ManifestStats, ScanFailure};

/// Raw results of one run, before ordering.
#[derive(Debug, Default)]
pub struct ScanResults {
    /// Fresh and reused entries, in any order.
    pub entries: Vec<ManifestEntry>,
    /// Failure records, in any order.
    pub failures: Vec<ScanFailure>,
    /// Eligible files found by the walk.
    pub total_files_seen: u64,
    /// How many of `entries` were reused.
    pub reused: u64,
}

/// Builds the final [`Manifest`] from unordered scan results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestAssembler {
    base_dir: String,
    max_bytes: u64,
    concurrency: usize,
}

impl ManifestAssembler {
    /// Creates an assembler recording the run parameters in the stats.
    #[must_use]
    pub fn new(base_dir: impl Into<String>, max_bytes: u64, concurrency: usize) -> Self {
        Self {
            base_dir: base_dir.into(),
            max_bytes,
            concurrency,
        }
    }

    /// Sorts entries by `rel_path` (byte order) and failures by
    /// `(rel_path, reason)`, then derives the counts from the collections.
    ///
    /// # Examples
    ///
    /// ```
    /// use tdx_scanner::{ManifestAssembler, ScanResults};
    /// use tdx_core::ScanFailure;
    ///
    /// let results = ScanResults {
    ///     failures: vec![ScanFailure::new("b.txt", "x"), ScanFailure::new("a.txt", "y")],
    ///     total_files_seen: 2,
    ///     ..ScanResults::default()
    /// };
    ///
    /// let manifest = ManifestAssembler::new("", 10, 2).assemble(results, chrono::Utc::now());
    /// assert_eq!(manifest.errors[0].rel_path, "a.txt");
    /// assert_eq!(manifest.stats.failed, 2);
    /// assert!(manifest.is_consistent());
    /// ```
    #[must_use]
    pub fn assemble(&self, results: ScanResults, generated_at: DateTime<Utc>) -> Manifest {
        let ScanResults {
            mut entries,
            mut failures,
            total_files_seen,
            reused,
        } = results;

        entries.sort_unstable_by(|a, b| a.rel_path.cmp(&b.rel_path));
        entries.dedup_by(|later, earlier| later.rel_path == earlier.rel_path);
        failures.sort_unstable();

        let stats = ManifestStats {
            total_files_seen,
            indexed: entries.len() as u64,
            reused: reused.min(entries.len() as u64),
            failed: failures.len() as u64,
            max_bytes: self.max_bytes,
            concurrency: self.concurrency,
        };

        Manifest {
            version: MANIFEST_VERSION,
            generated_at,
            base_dir: self.base_dir.clone(),
            items: entries,
            stats,
            errors: failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tdx_core::{FileKey, Validation};

    fn entry(rel_path: &str) -> ManifestEntry {
        let key = FileKey::new(1, 1);
        ManifestEntry {
            id: rel_path.to_owned(),
            name: rel_path.to_owned(),
            rel_path: rel_path.to_owned(),
            size: 1,
            mtime: key.mtime(),
            content: String::new(),
            validation: Validation {
                content_hash: rel_path.to_owned(),
                file_key: key,
                normalized_length: 0,
            },
        }
    }

    fn paths(manifest: &Manifest) -> Vec<&str> {
        manifest.items.iter().map(|e| e.rel_path.as_str()).collect()
    }

    #[test]
    fn test_items_sorted_by_byte_order() {
        let results = ScanResults {
            entries: ["b.md", "B.md", "a/z.txt", "a.txt", "ä.txt"]
                .into_iter()
                .map(entry)
                .collect(),
            total_files_seen: 5,
            ..ScanResults::default()
        };

        let manifest = ManifestAssembler::new("root", 100, 4).assemble(results, Utc::now());

        assert_eq!(paths(&manifest), ["B.md", "a.txt", "a/z.txt", "b.md", "ä.txt"]);
        assert!(manifest.is_consistent());
    }

    #[test]
    fn test_order_is_independent_of_input_order() {
        let names = ["c.txt", "a.txt", "b/a.txt", "b.txt"];
        let at = Utc::now();
        let assembler = ManifestAssembler::new("", 1, 1);

        let forward = assembler.assemble(
            ScanResults {
                entries: names.into_iter().map(entry).collect(),
                ..ScanResults::default()
            },
            at,
        );
        let backward = assembler.assemble(
            ScanResults {
                entries: names.into_iter().rev().map(entry).collect(),
                ..ScanResults::default()
            },
            at,
        );

        assert_eq!(forward, backward);
    }

    #[test]
    fn test_stats_follow_collections() {
        let results = ScanResults {
            entries: vec![entry("a.txt"), entry("b.txt")],
            failures: vec![ScanFailure::new("c.txt", "too big")],
            total_files_seen: 3,
            reused: 1,
        };

        let manifest = ManifestAssembler::new("docs", 5_242_880, 8).assemble(results, Utc::now());

        assert_eq!(manifest.version, MANIFEST_VERSION);
        assert_eq!(manifest.base_dir, "docs");
        assert_eq!(
            manifest.stats,
            ManifestStats {
                total_files_seen: 3,
                indexed: 2,
                reused: 1,
                failed: 1,
                max_bytes: 5_242_880,
                concurrency: 8,
            }
        );
    }

    #[test]
    fn test_duplicate_paths_collapse() {
        let results = ScanResults {
            entries: vec![entry("dup.txt"), entry("dup.txt")],
            reused: 2,
            ..ScanResults::default()
        };
        let manifest = ManifestAssembler::new("", 1, 1).assemble(results, Utc::now());
        assert_eq!(manifest.items.len(), 1);
        assert_eq!(manifest.stats.reused, 1);
        assert!(manifest.is_consistent());
    }

    #[test]
    fn test_empty_results() {
        let manifest =
            ManifestAssembler::new("", 1, 2).assemble(ScanResults::default(), Utc::now());
        assert!(manifest.items.is_empty());
        assert!(manifest.errors.is_empty());
        assert_eq!(manifest.stats.indexed, 0);
        assert_eq!(manifest.stats.reused, 0);
        assert_eq!(manifest.stats.failed, 0);
    }
}
