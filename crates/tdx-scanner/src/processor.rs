//! Per-file reuse-or-reprocess logic.
//!
//! [`ContentProcessor`] turns one walked file into exactly one [`Outcome`]:
//!
//! 1. Stat the file. Reject it without reading if it exceeds the size ceiling.
//! 2. If the [`ValidityCache`] holds an entry with the same [`FileKey`], reuse
//!    it as-is. The file is not opened.
//! 3. Otherwise read the bytes, hash them, decode and normalize the text, and
//!    build a fresh [`ManifestEntry`].
//!
//! Any I/O failure along the way becomes [`Outcome::Failed`]; nothing here
//! panics or propagates an error to the caller.

use std::fs::File;
use std::io::Read;

use tdx_core::{FileKey, ManifestEntry, ScanFailure, Validation};

use crate::cache::ValidityCache;
use crate::error::FileError;
use crate::walker::WalkedFile;

/// The result of processing one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A fresh entry built from the file's current bytes.
    Indexed(ManifestEntry),
    /// The previous run's entry, unchanged.
    Reused(ManifestEntry),
    /// The file could not be indexed.
    Failed(ScanFailure),
}

impl Outcome {
    /// Returns the relative path this outcome is about.
    #[must_use]
    pub fn rel_path(&self) -> &str {
        match self {
            Self::Indexed(entry) | Self::Reused(entry) => &entry.rel_path,
            Self::Failed(failure) => &failure.rel_path,
        }
    }
}

/// Applies the size ceiling, the validity cache, and content extraction.
///
/// # Examples
///
/// ```no_run
/// use tdx_scanner::{ContentProcessor, Outcome, ValidityCache, WalkedFile};
///
/// let processor = ContentProcessor::new(5 * 1024 * 1024);
/// let file = WalkedFile {
///     path: "texts/hello.txt".into(),
///     rel_path: "hello.txt".to_owned(),
/// };
///
/// match processor.process(&file, &ValidityCache::empty()) {
///     Outcome::Indexed(entry) => println!("{} chars", entry.validation.normalized_length),
///     Outcome::Reused(_) => unreachable!("cold cache"),
///     Outcome::Failed(failure) => eprintln!("{}", failure.reason),
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentProcessor {
    max_bytes: u64,
}

impl ContentProcessor {
    /// Creates a processor rejecting files strictly larger than `max_bytes`.
    #[inline]
    #[must_use]
    pub const fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    /// Processes a single file. Never fails; errors become [`Outcome::Failed`].
    #[must_use]
    pub fn process(&self, file: &WalkedFile, cache: &ValidityCache) -> Outcome {
        match self.try_process(file, cache) {
            Ok(outcome) => outcome,
            Err(err) => {
                if err.is_oversize() {
                    tracing::debug!(path = %file.rel_path, error = %err, "file over size ceiling");
                } else {
                    tracing::warn!(path = %file.rel_path, error = %err, "file not indexed");
                }
                Outcome::Failed(err.into_failure(file.rel_path.clone()))
            }
        }
    }

    fn try_process(&self, file: &WalkedFile, cache: &ValidityCache) -> Result<Outcome, FileError> {
        let metadata = std::fs::metadata(&file.path).map_err(FileError::Metadata)?;
        let key = FileKey::from_metadata(&metadata).map_err(FileError::Metadata)?;

        self.check_size(key.size)?;

        if let Some(previous) = cache.lookup(&file.rel_path, &key) {
            return Ok(Outcome::Reused(previous.clone()));
        }

        let bytes = self.read_bounded(file)?;
        Ok(Outcome::Indexed(build_entry(file, key, &bytes)))
    }

    fn check_size(&self, size: u64) -> Result<(), FileError> {
        if size > self.max_bytes {
            return Err(FileError::Oversize {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }

    /// Reads at most one byte past the ceiling so a file that grew after
    /// the stat is still rejected.
    fn read_bounded(&self, file: &WalkedFile) -> Result<Vec<u8>, FileError> {
        let handle = File::open(&file.path).map_err(FileError::Read)?;
        let mut bytes = Vec::new();
        handle
            .take(self.max_bytes.saturating_add(1))
            .read_to_end(&mut bytes)
            .map_err(FileError::Read)?;
        self.check_size(bytes.len() as u64)?;
        Ok(bytes)
    }
}

/// Builds a fresh entry from the raw bytes of a file.
fn build_entry(file: &WalkedFile, key: FileKey, bytes: &[u8]) -> ManifestEntry {
    let hash = content_hash(bytes);
    let content = normalize_text(&String::from_utf8_lossy(bytes));
    let name = file
        .path
        .file_name()
        .unwrap_or(file.rel_path.as_str())
        .to_owned();

    ManifestEntry {
        id: hash.clone(),
        name,
        rel_path: file.rel_path.clone(),
        size: key.size,
        mtime: key.mtime(),
        validation: Validation {
            content_hash: hash,
            file_key: key,
            normalized_length: content.chars().count(),
        },
        content,
    }
}

/// Hex BLAKE3 digest of raw file bytes.
///
/// # Examples
///
/// ```
/// use tdx_scanner::content_hash;
///
/// let hash = content_hash(b"hello");
/// assert_eq!(hash.len(), 64);
/// assert_eq!(hash, content_hash(b"hello"));
/// assert_ne!(hash, content_hash(b"hello\r\n"));
/// ```
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Canonicalizes document text.
///
/// Strips leading byte-order marks, turns `\r\n` and lone `\r` into `\n`, and
/// trims trailing whitespace at the end of the document. Interior lines keep
/// their trailing spaces. Idempotent.
///
/// # Examples
///
/// ```
/// use tdx_scanner::normalize_text;
///
/// assert_eq!(normalize_text("\u{FEFF}a\r\nb\rc  \n\n"), "a\nb\nc");
/// assert_eq!(normalize_text("keep  \nthis"), "keep  \nthis");
/// ```
#[must_use]
pub fn normalize_text(raw: &str) -> String {
    let without_bom = raw.trim_start_matches('\u{FEFF}');
    let mut text = without_bom.replace("\r\n", "\n").replace('\r', "\n");
    let trimmed = text.trim_end().len();
    text.truncate(trimmed);
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use std::fs;

    fn walked(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> WalkedFile {
        let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap();
        fs::write(&path, bytes).unwrap();
        WalkedFile {
            path,
            rel_path: name.to_owned(),
        }
    }

    #[test]
    fn test_normalize_text_cases() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("\u{FEFF}"), "");
        assert_eq!(normalize_text("a\r\n\r\nb"), "a\n\nb");
        assert_eq!(normalize_text("a\n\r\nb"), "a\n\nb");
        assert_eq!(normalize_text("a\r\rb"), "a\n\nb");
        assert_eq!(normalize_text("  lead\t\n"), "  lead");
        assert_eq!(normalize_text("mid\u{FEFF}dle"), "mid\u{FEFF}dle");
    }

    #[test]
    fn test_normalize_text_is_idempotent() {
        let samples = [
            "\u{FEFF}\u{FEFF}title\r\nbody \r\n\r\n\t ",
            "plain",
            "\r\r\r",
            "x\r\n\ny\r",
            "ünïcødé \u{3000}\n",
        ];
        for raw in samples {
            let once = normalize_text(raw);
            assert_eq!(normalize_text(&once), once, "not idempotent for {raw:?}");
            assert!(!once.contains('\r'));
            assert!(!once.starts_with('\u{FEFF}'));
            assert_eq!(once.trim_end(), once);
        }
    }

    #[test]
    fn test_content_hash_is_over_raw_bytes() {
        assert_ne!(content_hash(b"a\r\nb"), content_hash(b"a\nb"));
        assert_eq!(
            content_hash(b""),
            "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
        );
    }

    #[test]
    fn test_process_fresh_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = walked(&dir, "hello.md", b"\xEF\xBB\xBFHi\r\nthere  \r\n");

        let Outcome::Indexed(entry) =
            ContentProcessor::new(1024).process(&file, &ValidityCache::empty())
        else {
            panic!("expected a fresh entry");
        };

        assert_eq!(entry.name, "hello.md");
        assert_eq!(entry.rel_path, "hello.md");
        assert_eq!(entry.size, 18);
        assert_eq!(entry.content, "Hi\nthere");
        assert_eq!(entry.validation.normalized_length, 8);
        assert_eq!(entry.id, entry.validation.content_hash);
        assert_eq!(entry.id, content_hash(b"\xEF\xBB\xBFHi\r\nthere  \r\n"));
        assert_eq!(entry.validation.file_key.size, 18);
        assert_eq!(entry.mtime, entry.validation.file_key.mtime());
    }

    #[test]
    fn test_process_invalid_utf8_is_lossy() {
        let dir = tempfile::tempdir().unwrap();
        let file = walked(&dir, "latin1.txt", b"caf\xE9");

        let Outcome::Indexed(entry) =
            ContentProcessor::new(1024).process(&file, &ValidityCache::empty())
        else {
            panic!("expected a fresh entry");
        };
        assert_eq!(entry.content, "caf\u{FFFD}");
        assert_eq!(entry.validation.normalized_length, 4);
    }

    #[test]
    fn test_length_counts_scalar_values() {
        let dir = tempfile::tempdir().unwrap();
        let file = walked(&dir, "emoji.md", "ok \u{1F600}".as_bytes());

        let Outcome::Indexed(entry) =
            ContentProcessor::new(1024).process(&file, &ValidityCache::empty())
        else {
            panic!("expected a fresh entry");
        };
        assert_eq!(entry.validation.normalized_length, 4);
        assert_eq!(entry.content.encode_utf16().count(), 5);
    }

    #[test]
    fn test_size_ceiling_is_inclusive() {
        let dir = tempfile::tempdir().unwrap();
        let at_limit = walked(&dir, "at.txt", &[b'a'; 10]);
        let over_limit = walked(&dir, "over.txt", &[b'a'; 11]);
        let processor = ContentProcessor::new(10);

        assert!(matches!(
            processor.process(&at_limit, &ValidityCache::empty()),
            Outcome::Indexed(_)
        ));

        let Outcome::Failed(failure) = processor.process(&over_limit, &ValidityCache::empty())
        else {
            panic!("expected an oversize rejection");
        };
        assert_eq!(failure.rel_path, "over.txt");
        assert!(failure.reason.contains("10 bytes"));
    }

    #[test]
    fn test_reuse_skips_reading() {
        let dir = tempfile::tempdir().unwrap();
        let file = walked(&dir, "same.txt", b"original");
        let processor = ContentProcessor::new(1024);

        let Outcome::Indexed(first) = processor.process(&file, &ValidityCache::empty()) else {
            panic!("expected a fresh entry");
        };

        // Same size and restored mtime: the cached entry wins over the bytes.
        let mtime = fs::metadata(&file.path).unwrap().modified().unwrap();
        fs::write(&file.path, b"modified").unwrap();
        fs::File::options()
            .write(true)
            .open(&file.path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();

        let cache = ValidityCache::from_manifest(tdx_core::Manifest {
            version: tdx_core::MANIFEST_VERSION,
            generated_at: chrono::Utc::now(),
            base_dir: String::new(),
            items: vec![first.clone()],
            stats: tdx_core::ManifestStats::default(),
            errors: Vec::new(),
        });

        assert_eq!(processor.process(&file, &cache), Outcome::Reused(first));
    }

    #[test]
    fn test_oversize_wins_over_cache() {
        let dir = tempfile::tempdir().unwrap();
        let file = walked(&dir, "big.txt", &[b'x'; 32]);

        let Outcome::Indexed(entry) =
            ContentProcessor::new(64).process(&file, &ValidityCache::empty())
        else {
            panic!("expected a fresh entry");
        };
        let cache = ValidityCache::from_manifest(tdx_core::Manifest {
            version: tdx_core::MANIFEST_VERSION,
            generated_at: chrono::Utc::now(),
            base_dir: String::new(),
            items: vec![entry],
            stats: tdx_core::ManifestStats::default(),
            errors: Vec::new(),
        });

        let outcome = ContentProcessor::new(16).process(&file, &cache);
        assert!(matches!(outcome, Outcome::Failed(_)));
    }

    #[test]
    fn test_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = WalkedFile {
            path: Utf8PathBuf::from_path_buf(dir.path().join("gone.txt")).unwrap(),
            rel_path: "gone.txt".to_owned(),
        };

        let outcome = ContentProcessor::new(1024).process(&file, &ValidityCache::empty());
        assert_eq!(outcome.rel_path(), "gone.txt");
        let Outcome::Failed(failure) = outcome else {
            panic!("expected a failure");
        };
        assert!(failure.reason.starts_with("failed to read metadata"));
    }
}
