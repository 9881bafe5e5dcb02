//! Configuration structures for the textdex indexer.
//!
//! This module provides configuration types for all components of the application:
//!
//! - [`ScanConfig`] - Scanner settings (root, output, extensions, size ceiling, parallelism)
//! - [`ServeConfig`] - HTTP surface settings (bind address, startup scan)
//! - [`Config`] - Root configuration combining all settings
//!
//! A [`Config`] is built once at startup (defaults, then an optional JSON file,
//! then CLI flags and environment variables) and passed by value into the
//! scanner. Nothing here is global.

use std::num::NonZeroUsize;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};

use crate::error::ConfigError;

/// Default per-file size ceiling: 5 MiB.
pub const DEFAULT_MAX_BYTES: u64 = 5 * 1024 * 1024;

/// Lower bound for the automatically derived worker count.
pub const MIN_AUTO_CONCURRENCY: usize = 2;

/// Upper bound for the automatically derived worker count.
pub const MAX_AUTO_CONCURRENCY: usize = 8;

/// Hard upper bound for an explicitly configured worker count.
const MAX_EXPLICIT_CONCURRENCY: usize = 64;

/// Configuration for a scan-and-persist cycle.
///
/// # Examples
///
/// ```
/// use tdx_core::{ScanConfig, DEFAULT_MAX_BYTES};
///
/// let config = ScanConfig::default();
/// assert_eq!(config.max_bytes, DEFAULT_MAX_BYTES);
/// assert_eq!(config.output_path, "index.json");
/// assert!(config.allowed_extensions.iter().any(|ext| ext == "md"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Directory whose files are indexed (recursively).
    pub root_path: Utf8PathBuf,

    /// Location of the persisted manifest.
    pub output_path: Utf8PathBuf,

    /// File extensions eligible for indexing, compared case-insensitively.
    ///
    /// A leading dot is optional (`"md"` and `".md"` are equivalent).
    pub allowed_extensions: SmallVec<[String; 4]>,

    /// Files strictly larger than this many bytes are rejected.
    pub max_bytes: u64,

    /// Number of concurrent workers.
    ///
    /// `None` derives the count from available parallelism, clamped to
    /// [`MIN_AUTO_CONCURRENCY`]..=[`MAX_AUTO_CONCURRENCY`].
    pub concurrency: Option<usize>,

    /// Whether to follow symbolic links while walking.
    pub follow_links: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root_path: Utf8PathBuf::from("."),
            output_path: Utf8PathBuf::from("index.json"),
            allowed_extensions: smallvec!["txt".to_owned(), "md".to_owned()],
            max_bytes: DEFAULT_MAX_BYTES,
            concurrency: None,
            follow_links: false,
        }
    }
}

impl ScanConfig {
    /// Creates a configuration for the given root, writing the manifest to
    /// `index.json` inside that root.
    ///
    /// # Examples
    ///
    /// ```
    /// use tdx_core::ScanConfig;
    /// use camino::Utf8Path;
    ///
    /// let config = ScanConfig::new(Utf8Path::new("texts"));
    /// assert_eq!(config.output_path, "texts/index.json");
    /// ```
    #[must_use]
    pub fn new(root: &Utf8Path) -> Self {
        Self {
            root_path: root.to_owned(),
            output_path: root.join("index.json"),
            ..Self::default()
        }
    }

    /// Sets the manifest output path.
    #[must_use]
    pub fn with_output_path(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    /// Sets the per-file size ceiling in bytes.
    #[must_use]
    pub const fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Sets an explicit worker count.
    #[must_use]
    pub const fn with_concurrency(mut self, workers: usize) -> Self {
        self.concurrency = Some(workers);
        self
    }

    /// Replaces the set of eligible extensions.
    #[must_use]
    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.allowed_extensions = extensions.iter().map(ToString::to_string).collect();
        self
    }

    /// Configures whether to follow symbolic links.
    #[must_use]
    pub const fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Returns the number of workers a scan will use.
    ///
    /// # Examples
    ///
    /// ```
    /// use tdx_core::{ScanConfig, MIN_AUTO_CONCURRENCY, MAX_AUTO_CONCURRENCY};
    ///
    /// let auto = ScanConfig::default().effective_concurrency();
    /// assert!((MIN_AUTO_CONCURRENCY..=MAX_AUTO_CONCURRENCY).contains(&auto));
    ///
    /// let explicit = ScanConfig::default().with_concurrency(3);
    /// assert_eq!(explicit.effective_concurrency(), 3);
    /// ```
    #[must_use]
    pub fn effective_concurrency(&self) -> usize {
        match self.concurrency {
            Some(workers) => workers.clamp(1, MAX_EXPLICIT_CONCURRENCY),
            None => std::thread::available_parallelism()
                .map_or(MIN_AUTO_CONCURRENCY, NonZeroUsize::get)
                .clamp(MIN_AUTO_CONCURRENCY, MAX_AUTO_CONCURRENCY),
        }
    }

    /// Checks option values that would make every scan meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::invalid_option(
                "max_bytes",
                "must be greater than zero",
            ));
        }
        if self
            .allowed_extensions
            .iter()
            .all(|ext| ext.trim_start_matches('.').is_empty())
        {
            return Err(ConfigError::invalid_option(
                "allowed_extensions",
                "at least one non-empty extension is required",
            ));
        }
        if self.output_path.as_str().is_empty() {
            return Err(ConfigError::InvalidPath {
                path: self.output_path.clone(),
                reason: "output path is empty".to_owned(),
            });
        }
        Ok(())
    }
}

/// Configuration for the HTTP surface (`tdx serve`).
///
/// # Examples
///
/// ```
/// use tdx_core::ServeConfig;
///
/// let config = ServeConfig::default();
/// assert_eq!(config.port, 3000);
/// assert!(config.scan_on_start);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Interface to bind.
    pub host: String,

    /// TCP port to bind.
    pub port: u16,

    /// Whether to run one scan when the server boots.
    pub scan_on_start: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 3000,
            scan_on_start: true,
        }
    }
}

/// Root configuration for textdex.
///
/// # Examples
///
/// ```
/// use tdx_core::Config;
///
/// let config: Config = serde_json::from_str(r#"{"scan": {"max_bytes": 1024}}"#).unwrap();
/// assert_eq!(config.scan.max_bytes, 1024);
/// assert_eq!(config.serve.port, 3000);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scanner configuration.
    pub scan: ScanConfig,

    /// HTTP surface configuration.
    pub serve: ServeConfig,
}

impl Config {
    /// Loads a configuration from a JSON file. Missing fields take their
    /// default values.
    pub fn from_json_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_std_path())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.scan.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_config_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.root_path, ".");
        assert_eq!(config.output_path, "index.json");
        assert_eq!(config.allowed_extensions.as_slice(), ["txt", "md"]);
        assert_eq!(config.max_bytes, 5_242_880);
        assert!(config.concurrency.is_none());
        assert!(!config.follow_links);
    }

    #[test]
    fn test_scan_config_builders() {
        let config = ScanConfig::new(Utf8Path::new("/srv/texts"))
            .with_output_path("/tmp/out.json")
            .with_max_bytes(10)
            .with_concurrency(4)
            .with_extensions(&["rst"])
            .with_follow_links(true);

        assert_eq!(config.root_path, "/srv/texts");
        assert_eq!(config.output_path, "/tmp/out.json");
        assert_eq!(config.max_bytes, 10);
        assert_eq!(config.concurrency, Some(4));
        assert_eq!(config.allowed_extensions.as_slice(), ["rst"]);
        assert!(config.follow_links);
    }

    #[test]
    fn test_effective_concurrency_auto_is_clamped() {
        let workers = ScanConfig::default().effective_concurrency();
        assert!(workers >= MIN_AUTO_CONCURRENCY);
        assert!(workers <= MAX_AUTO_CONCURRENCY);
    }

    #[test]
    fn test_effective_concurrency_explicit_is_clamped() {
        assert_eq!(ScanConfig::default().with_concurrency(0).effective_concurrency(), 1);
        assert_eq!(ScanConfig::default().with_concurrency(5).effective_concurrency(), 5);
        assert_eq!(
            ScanConfig::default().with_concurrency(1000).effective_concurrency(),
            64
        );
    }

    #[test]
    fn test_validate_rejects_zero_ceiling() {
        let err = ScanConfig::default().with_max_bytes(0).validate().unwrap_err();
        assert!(err.to_string().contains("max_bytes"));
    }

    #[test]
    fn test_validate_rejects_empty_extensions() {
        let config = ScanConfig::default().with_extensions(&[".", ""]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("allowed_extensions"));
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(ScanConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_config_deserialize_with_missing_fields() {
        let json = r#"{"scan": {"root_path": "texts", "allowed_extensions": ["md"]}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.scan.root_path, "texts");
        assert_eq!(config.scan.allowed_extensions.as_slice(), ["md"]);
        // Other fields should have defaults
        assert_eq!(config.scan.max_bytes, DEFAULT_MAX_BYTES);
        assert_eq!(config.serve.host, "0.0.0.0");
    }

    #[test]
    fn test_config_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("tdx.json")).unwrap();
        std::fs::write(&path, r#"{"serve": {"port": 8080, "scan_on_start": false}}"#).unwrap();

        let config = Config::from_json_file(&path).unwrap();
        assert_eq!(config.serve.port, 8080);
        assert!(!config.serve.scan_on_start);
    }

    #[test]
    fn test_config_from_missing_file() {
        let err = Config::from_json_file(Utf8Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
