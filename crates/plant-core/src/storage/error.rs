//! Storage error handling
//!
//! Typed errors for the device document with descriptive messages and
//! recovery suggestions.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or persisting the device document
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to create data directory
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Permission denied accessing path
    #[error("Permission denied: cannot access '{path}'. Check file permissions.")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Disk is full or quota exceeded
    #[error(
        "Disk full or quota exceeded while writing to '{path}'. Free up disk space and try again."
    )]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read file
    #[error("Failed to read '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write file
    #[error("Failed to write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Document exists but is not valid JSON of the expected shape
    #[error("Invalid document format in '{path}': {details}")]
    InvalidFormat { path: PathBuf, details: String },

    /// Document was written by an incompatible schema
    #[error("Document at '{path}' has schema version {found}, expected {expected}")]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    /// Atomic write failed during rename
    #[error("Atomic write failed: could not rename '{from}' to '{to}': {source}")]
    AtomicWriteFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Document could not be encoded
    #[error("Failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StorageError {
    /// Classify an I/O error raised while reading `path`
    pub fn from_read(error: io::Error, path: PathBuf) -> Self {
        match classify(&error) {
            Some(Class::PermissionDenied) => StorageError::PermissionDenied {
                path,
                source: error,
            },
            _ => StorageError::ReadError {
                path,
                source: error,
            },
        }
    }

    /// Classify an I/O error raised while writing `path`
    ///
    /// Permission and disk-full conditions get their own variants so callers
    /// can offer a recovery hint.
    pub fn from_write(error: io::Error, path: PathBuf) -> Self {
        match classify(&error) {
            Some(Class::PermissionDenied) => StorageError::PermissionDenied {
                path,
                source: error,
            },
            Some(Class::DiskFull) => StorageError::DiskFull {
                path,
                source: error,
            },
            None => StorageError::WriteError {
                path,
                source: error,
            },
        }
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::DiskFull { .. } => Some("Free up disk space and try again."),
            StorageError::PermissionDenied { .. } => {
                Some("Check file and directory permissions. You may need to run with different permissions or change ownership.")
            }
            StorageError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            StorageError::InvalidFormat { .. } => {
                Some("The previous document was left untouched. Fix or move it aside, then try again.")
            }
            _ => None,
        }
    }
}

enum Class {
    PermissionDenied,
    DiskFull,
}

fn classify(error: &io::Error) -> Option<Class> {
    if error.kind() == io::ErrorKind::PermissionDenied {
        return Some(Class::PermissionDenied);
    }
    if is_disk_full_error(error) {
        return Some(Class::DiskFull);
    }
    None
}

/// Check if an I/O error indicates disk full condition
fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_classification() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err = StorageError::from_write(io_err, PathBuf::from("/test/devices.json"));

        assert!(matches!(err, StorageError::PermissionDenied { .. }));
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_read_failure_is_read_error() {
        let io_err = io::Error::new(io::ErrorKind::InvalidData, "bad sector");
        let err = StorageError::from_read(io_err, PathBuf::from("/data/devices.json"));

        assert!(matches!(err, StorageError::ReadError { .. }));
        assert!(err.recovery_suggestion().is_none());
    }

    #[test]
    fn test_disk_full_detection() {
        let io_err = io::Error::new(io::ErrorKind::Other, "No space left on device");
        let err = StorageError::from_write(io_err, PathBuf::from("/full/disk"));

        assert!(matches!(err, StorageError::DiskFull { .. }));
        assert_eq!(
            err.recovery_suggestion(),
            Some("Free up disk space and try again.")
        );
    }

    #[test]
    fn test_unsupported_version_display() {
        let err = StorageError::UnsupportedVersion {
            path: PathBuf::from("/data/devices.json"),
            found: 2,
            expected: 1,
        };

        let msg = err.to_string();
        assert!(msg.contains("schema version 2"));
        assert!(msg.contains("expected 1"));
    }
}
