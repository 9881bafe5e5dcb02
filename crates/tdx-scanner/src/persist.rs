//! Manifest persistence.
//!
//! The manifest is written to a temporary file in the destination directory
//! and then renamed over the target, so readers observe either the previous
//! manifest or the new one, never a truncated file.

use std::io::{BufWriter, Write};

use camino::Utf8Path;
use tdx_core::Manifest;
use tempfile::NamedTempFile;

use crate::error::ScanError;

/// Atomically replaces the manifest at `path`.
///
/// Missing parent directories are created.
///
/// # Errors
///
/// Returns [`ScanError::Persist`] if the temporary file cannot be created,
/// written, or renamed, and [`ScanError::Serialize`] if encoding fails.
pub fn write_manifest(path: &Utf8Path, manifest: &Manifest) -> Result<(), ScanError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|err| ScanError::persist(path, err))?;

    let temp = NamedTempFile::new_in(parent).map_err(|err| ScanError::persist(path, err))?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        serde_json::to_writer_pretty(&mut writer, manifest).map_err(|err| {
            if err.is_io() {
                ScanError::persist(path, err.into())
            } else {
                ScanError::Serialize(err)
            }
        })?;
        writer.flush().map_err(|err| ScanError::persist(path, err))?;
    }
    temp.as_file()
        .sync_all()
        .map_err(|err| ScanError::persist(path, err))?;
    temp.persist(path)
        .map_err(|err| ScanError::persist(path, err.error))?;

    tracing::debug!(
        path = %path,
        items = manifest.items.len(),
        errors = manifest.errors.len(),
        "wrote manifest"
    );
    Ok(())
}

/// Reads the manifest at `path`.
///
/// Returns `Ok(None)` if no manifest exists yet.
///
/// # Errors
///
/// Returns [`ScanError::Load`] if the file exists but cannot be read and
/// [`ScanError::Parse`] if it is not a valid manifest.
pub fn read_manifest(path: &Utf8Path) -> Result<Option<Manifest>, ScanError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ScanError::Load {
                path: path.to_owned(),
                source,
            });
        }
    };

    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| ScanError::Parse {
            path: path.to_owned(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tdx_core::{MANIFEST_VERSION, ManifestStats, ScanFailure};

    fn sample() -> Manifest {
        Manifest {
            version: MANIFEST_VERSION,
            generated_at: tdx_core::timestamp::from_millis(1_700_000_000_000),
            base_dir: "texts".to_owned(),
            items: Vec::new(),
            stats: ManifestStats {
                failed: 1,
                max_bytes: 10,
                concurrency: 2,
                ..ManifestStats::default()
            },
            errors: vec![ScanFailure::new("big.txt", "exceeds 10 bytes (file is 11 bytes)")],
        }
    }

    fn utf8_dir(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = utf8_dir(&dir).join("index.json");

        write_manifest(&path, &sample()).unwrap();
        assert_eq!(read_manifest(&path).unwrap(), Some(sample()));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("{\n  \"version\": 1,"));
    }

    #[test]
    fn test_persisted_wire_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = utf8_dir(&dir).join("index.json");
        write_manifest(&path, &sample()).unwrap();

        let persisted = read_manifest(&path).unwrap().unwrap();
        insta::assert_json_snapshot!(persisted, @r###"
        {
          "version": 1,
          "generatedAt": "2023-11-14T22:13:20.000Z",
          "baseDir": "texts",
          "items": [],
          "stats": {
            "totalFilesSeen": 0,
            "indexed": 0,
            "reused": 0,
            "failed": 1,
            "maxBytes": 10,
            "concurrency": 2
          },
          "errors": [
            {
              "relPath": "big.txt",
              "reason": "exceeds 10 bytes (file is 11 bytes)"
            }
          ]
        }
        "###);
    }

    #[test]
    fn test_write_replaces_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8_dir(&dir);
        let path = root.join("index.json");
        std::fs::write(&path, "stale").unwrap();

        write_manifest(&path, &sample()).unwrap();

        let names: Vec<_> = std::fs::read_dir(&root)
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, ["index.json"]);
        assert!(read_manifest(&path).unwrap().is_some());
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = utf8_dir(&dir).join("nested/out/index.json");
        write_manifest(&path, &sample()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_write_to_unwritable_location_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = utf8_dir(&dir).join("file");
        std::fs::write(&blocker, "not a dir").unwrap();

        let err = write_manifest(&blocker.join("index.json"), &sample()).unwrap_err();
        assert!(matches!(err, ScanError::Persist { .. }));
        assert_eq!(err.path(), Some(&blocker.join("index.json")));
    }

    #[test]
    fn test_read_missing_and_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = utf8_dir(&dir).join("index.json");
        assert_eq!(read_manifest(&path).unwrap(), None);

        std::fs::write(&path, "{\"version\": 1").unwrap();
        assert!(matches!(
            read_manifest(&path).unwrap_err(),
            ScanError::Parse { .. }
        ));
    }
}
