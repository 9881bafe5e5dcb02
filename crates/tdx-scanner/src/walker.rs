//! Directory traversal for document files.
//!
//! This module provides [`FileWalker`], which uses the `ignore` crate to walk
//! the scan root and hands every regular file to a [`FileFilter`].
//!
//! # Walk policy
//!
//! - Hidden files and `.gitignore`/`.ignore` rules get no special treatment
//! - Symbolic links are not followed unless configured
//! - Entries that cannot be listed are recorded as [`ScanFailure`]s and the
//!   walk continues with their siblings
//! - The manifest output file is never a candidate, even when it lives under
//!   the root and matches the filter
//!
//! # Examples
//!
//! ```no_run
//! use tdx_scanner::{ExtensionFilter, FileWalker};
//! use camino::Utf8Path;
//!
//! let walker = FileWalker::new(Utf8Path::new("./texts"))?;
//! let outcome = walker.walk(&ExtensionFilter::default());
//!
//! for file in &outcome.files {
//!     println!("Found: {}", file.rel_path);
//! }
//! # Ok::<(), tdx_scanner::ScanError>(())
//! ```

use std::path::Path;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use ignore::WalkBuilder;
use tdx_core::ScanFailure;

use crate::error::{FileError, ScanError};
use crate::filter::FileFilter;

/// An eligible file discovered by the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedFile {
    /// Path as reached from the root (usable for I/O).
    pub path: Utf8PathBuf,
    /// Path relative to the root, `/`-separated.
    pub rel_path: String,
}

/// Everything a single walk produced.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    /// Eligible files, in walk order.
    pub files: Vec<WalkedFile>,
    /// Entries that could not be listed or keyed.
    pub failures: Vec<ScanFailure>,
}

/// A file walker that discovers candidate documents under a root.
///
/// # Design
///
/// The walker uses the "collect-then-parallelize" pattern: paths are
/// gathered on one thread (I/O bound), then processed by the worker pool.
#[derive(Debug)]
pub struct FileWalker {
    /// The root directory to walk.
    root: Utf8PathBuf,
    /// Whether to follow symbolic links.
    follow_links: bool,
    /// Root-relative path that must never become a candidate.
    excluded: Option<String>,
}

impl FileWalker {
    /// Creates a new file walker for the given root directory.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Config`] if the root path doesn't exist or
    /// isn't a directory.
    pub fn new(root: &Utf8Path) -> Result<Self, ScanError> {
        if !root.exists() {
            return Err(ScanError::config(format!(
                "root path does not exist: {root}"
            )));
        }
        if !root.is_dir() {
            return Err(ScanError::config(format!(
                "root path is not a directory: {root}"
            )));
        }

        Ok(Self {
            root: root.to_owned(),
            follow_links: false,
            excluded: None,
        })
    }

    /// Configures whether to follow symbolic links.
    ///
    /// By default, symbolic links are not followed.
    #[must_use]
    pub const fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Excludes a file (typically the manifest itself) from the walk.
    ///
    /// `path` may be relative to the working directory or absolute. Paths
    /// outside the root have no effect.
    #[must_use]
    pub fn with_excluded(mut self, path: &Utf8Path) -> Self {
        self.excluded = root_relative(&self.root, path);
        self
    }

    /// Walks the tree and returns every regular file accepted by `filter`.
    ///
    /// Never fails: listing errors and non-UTF-8 paths end up in
    /// [`WalkOutcome::failures`].
    pub fn walk(&self, filter: &dyn FileFilter) -> WalkOutcome {
        let mut outcome = WalkOutcome::default();

        for result in self.build_walker() {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    let rel_path = error_path(&err)
                        .and_then(|path| self.rel_path_of(path))
                        .unwrap_or_default();
                    tracing::warn!(path = %rel_path, error = %err, "walk error");
                    outcome
                        .failures
                        .push(FileError::from(err).into_failure(rel_path));
                    continue;
                }
            };

            // Directories, and symlinks when not following them.
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let Some(path) = Utf8Path::from_path(entry.path()) else {
                let rel_path = self.rel_path_lossy(entry.path());
                outcome
                    .failures
                    .push(FileError::NonUtf8Path(entry.path().to_owned()).into_failure(rel_path));
                continue;
            };

            if !filter.is_eligible(path) {
                continue;
            }

            let Some(rel_path) = self.rel_path_of(path.as_std_path()) else {
                continue;
            };
            if self.excluded.as_deref() == Some(rel_path.as_str()) {
                continue;
            }

            outcome.files.push(WalkedFile {
                path: path.to_owned(),
                rel_path,
            });
        }

        tracing::debug!(
            root = %self.root,
            files = outcome.files.len(),
            failures = outcome.failures.len(),
            "walk complete"
        );
        outcome
    }

    /// Builds the ignore walker with configured settings.
    fn build_walker(&self) -> ignore::Walk {
        WalkBuilder::new(&self.root)
            // Plain traversal: no ignore files, hidden entries included
            .standard_filters(false)
            .hidden(false)
            .follow_links(self.follow_links)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build()
    }

    /// Converts a walked path to its `/`-separated form relative to the root.
    fn rel_path_of(&self, path: &Path) -> Option<String> {
        let rel = Utf8Path::from_path(path)?.strip_prefix(&self.root).ok()?;
        Some(join_components(rel))
    }

    fn rel_path_lossy(&self, path: &Path) -> String {
        let rel = path.strip_prefix(self.root.as_std_path()).unwrap_or(path);
        rel.to_string_lossy().replace('\\', "/")
    }
}

/// Joins the normal components of a relative path with `/`.
fn join_components(path: &Utf8Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Utf8Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolves `path` against the root after canonicalizing both sides.
///
/// The file itself need not exist yet; only its parent directory must.
fn root_relative(root: &Utf8Path, path: &Utf8Path) -> Option<String> {
    let root = root.canonicalize_utf8().ok()?;
    let name = path.file_name()?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let full = parent.canonicalize_utf8().ok()?.join(name);
    let rel = full.strip_prefix(&root).ok()?;
    Some(join_components(rel))
}

/// Digs the offending path out of a (possibly wrapped) walk error.
fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::Loop { child, .. } => Some(child.as_path()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        ignore::Error::Partial(errors) => errors.iter().find_map(error_path),
        _ => None,
    }
}
