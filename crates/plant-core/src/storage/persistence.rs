//! Device document persistence
//!
//! Handles saving and loading the device document to/from the filesystem.
//! Uses atomic writes (write to temp file, then rename) so that a crash
//! mid-write never leaves a half-written document behind.
//!
//! Storage location: `~/.local/share/plant/devices.json` (configurable via
//! `Config`)

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::{StorageError, StorageResult};
use crate::config::Config;
use crate::document::{DeviceDocument, CURRENT_SCHEMA_VERSION};

/// Persistence layer for the device document
pub struct JsonPersistence {
    path: PathBuf,
}

impl JsonPersistence {
    /// Create a persistence handler writing to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a persistence handler for the document inside the configured
    /// data directory
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.document_path())
    }

    /// Path of the document file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if a document exists on disk
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the document from disk
    ///
    /// Returns `None` if the document file doesn't exist.
    /// Returns an error if the file exists but can't be read or parsed.
    pub fn load(&self) -> StorageResult<Option<DeviceDocument>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::from_read(e, self.path.clone())),
        };

        let doc: DeviceDocument =
            serde_json::from_slice(&bytes).map_err(|e| StorageError::InvalidFormat {
                path: self.path.clone(),
                details: e.to_string(),
            })?;

        if doc.version != CURRENT_SCHEMA_VERSION {
            return Err(StorageError::UnsupportedVersion {
                path: self.path.clone(),
                found: doc.version,
                expected: CURRENT_SCHEMA_VERSION,
            });
        }

        debug!(
            path = %self.path.display(),
            devices = doc.devices.len(),
            "loaded device document"
        );
        Ok(Some(doc))
    }

    /// Save the document to disk using atomic write
    pub fn save(&self, doc: &DeviceDocument) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(doc)?;
        atomic_write(&self.path, &bytes)?;

        debug!(
            path = %self.path.display(),
            devices = doc.devices.len(),
            "saved device document"
        );
        Ok(())
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    // Same directory, so the final rename stays on one filesystem
    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_write(e, temp_path.clone()))?;

    file.write_all(data)
        .map_err(|e| StorageError::from_write(e, temp_path.clone()))?;

    file.sync_all()
        .map_err(|e| StorageError::from_write(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::AtomicWriteFailed {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn persistence(temp_dir: &TempDir) -> JsonPersistence {
        JsonPersistence::new(temp_dir.path().join("devices.json"))
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = persistence(&temp_dir);

        assert!(!persistence.exists());
        assert!(persistence.load().unwrap().is_none());

        let mut doc = DeviceDocument::new();
        doc.merge(
            "rose",
            [("days_between_waterings".to_string(), "7".to_string())].into(),
        );
        persistence.save(&doc).unwrap();
        assert!(persistence.exists());

        let loaded = persistence.load().unwrap().unwrap();
        assert_eq!(loaded, doc);
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = persistence(&temp_dir);
        fs::write(persistence.path(), b"{ not json").unwrap();

        let err = persistence.load().unwrap_err();
        assert!(matches!(err, StorageError::InvalidFormat { .. }));
    }

    #[test]
    fn test_future_schema_version_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = persistence(&temp_dir);
        fs::write(persistence.path(), br#"{"version": 2, "devices": {}}"#).unwrap();

        let err = persistence.load().unwrap_err();
        assert!(matches!(
            err,
            StorageError::UnsupportedVersion { found: 2, .. }
        ));
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir.path().join("a").join("b").join("devices.json");

        atomic_write(&nested_path, b"{}").unwrap();

        assert!(nested_path.exists());
        assert!(!nested_path.with_extension("tmp").exists());
        assert_eq!(fs::read_to_string(&nested_path).unwrap(), "{}");
    }

    #[test]
    fn test_save_replaces_previous_copy() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = persistence(&temp_dir);

        let mut doc = DeviceDocument::new();
        doc.merge("rose", [("health".to_string(), "good".to_string())].into());
        persistence.save(&doc).unwrap();

        doc.remove("rose");
        persistence.save(&doc).unwrap();

        let loaded = persistence.load().unwrap().unwrap();
        assert!(loaded.devices.is_empty());
    }
}
