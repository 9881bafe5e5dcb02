//! Eligibility filtering for walked paths.
//!
//! The walker yields every regular file under the root; a [`FileFilter`]
//! decides which of them become scan candidates. Files that fail the filter
//! are simply ineligible: they are neither indexed nor reported as errors.
//!
//! # Examples
//!
//! ```
//! use tdx_scanner::{ExtensionFilter, FileFilter};
//! use camino::Utf8Path;
//!
//! let filter = ExtensionFilter::new(&["txt", ".md"]);
//!
//! assert!(filter.is_eligible(Utf8Path::new("notes/todo.txt")));
//! assert!(filter.is_eligible(Utf8Path::new("README.MD")));
//! assert!(!filter.is_eligible(Utf8Path::new("logo.png")));
//! ```

use camino::Utf8Path;
use smallvec::SmallVec;
use tdx_core::ScanConfig;

/// Decides whether a path qualifies for indexing.
///
/// Implementations must be pure and total: no I/O, no panics.
///
/// # Thread Safety
///
/// Filters are shared by the scanner across runs and threads, so they must
/// be [`Send`] and [`Sync`].
///
/// # Examples
///
/// ```
/// use tdx_scanner::FileFilter;
/// use camino::Utf8Path;
///
/// struct NoDrafts;
///
/// impl FileFilter for NoDrafts {
///     fn is_eligible(&self, path: &Utf8Path) -> bool {
///         !path.as_str().contains("drafts/")
///     }
/// }
///
/// assert!(!NoDrafts.is_eligible(Utf8Path::new("drafts/a.md")));
/// ```
pub trait FileFilter: Send + Sync + 'static {
    /// Returns `true` if the file at `path` should be indexed.
    fn is_eligible(&self, path: &Utf8Path) -> bool;
}

/// Accepts files whose extension is in a fixed allow-set.
///
/// Extensions are stored lowercased without a leading dot and compared
/// case-insensitively. A file without an extension (including dotfiles such
/// as `.md`) never matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionFilter {
    extensions: SmallVec<[String; 4]>,
}

impl ExtensionFilter {
    /// Creates a filter accepting the given extensions.
    #[must_use]
    pub fn new(extensions: &[&str]) -> Self {
        Self::from_iter_normalized(extensions.iter().copied())
    }

    /// Creates the filter described by a scan configuration.
    #[must_use]
    pub fn from_config(config: &ScanConfig) -> Self {
        Self::from_iter_normalized(config.allowed_extensions.iter().map(String::as_str))
    }

    /// Returns the normalized allow-set.
    #[must_use]
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    fn from_iter_normalized<'a>(extensions: impl Iterator<Item = &'a str>) -> Self {
        let mut normalized: SmallVec<[String; 4]> = SmallVec::new();
        for ext in extensions {
            let ext = ext.trim_start_matches('.').to_lowercase();
            if !ext.is_empty() && !normalized.contains(&ext) {
                normalized.push(ext);
            }
        }
        Self {
            extensions: normalized,
        }
    }
}

impl Default for ExtensionFilter {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}

impl FileFilter for ExtensionFilter {
    fn is_eligible(&self, path: &Utf8Path) -> bool {
        path.extension().is_some_and(|ext| {
            let ext = ext.to_lowercase();
            self.extensions.iter().any(|allowed| *allowed == ext)
        })
    }
}
