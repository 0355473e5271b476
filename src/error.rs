//! Custom error types for vault-backup
//!
//! This module defines the error hierarchy for the library using thiserror
//! for ergonomic error definitions. Every variant carries the path or command
//! that caused it so a failed cycle can be diagnosed from the log alone.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// The main error type for vault-backup operations
#[derive(Error, Debug)]
pub enum BackupError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// A file name template could not be compiled
    #[error("Pattern error: {0}")]
    Pattern(String),

    /// The backup directory could not be enumerated
    #[error("Failed to read directory {}: {source}", .path.display())]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The archiver exited unsuccessfully, could not be launched, or the
    /// builtin writer failed
    #[error("Archive creation failed ({command}): {reason}")]
    ArchiveCreation { command: String, reason: String },

    /// The external archiver did not finish in time
    #[error("Archive creation timed out after {timeout:?} ({command})")]
    ArchiveTimeout { command: String, timeout: Duration },

    /// Archive creation was cancelled by the caller
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// A single backup file could not be removed
    #[error("Failed to delete {}: {reason}", .path.display())]
    Deletion { path: PathBuf, reason: String },

    /// The per-day pass failed after the age pass had already removed files
    #[error("Pruning stopped after removing {} backup(s): {source}", .deleted.len())]
    PruneInterrupted {
        deleted: Vec<PathBuf>,
        #[source]
        source: Box<BackupError>,
    },

    /// The configured archiver type is not one we know how to drive
    #[error("Unsupported archiver type: {0}")]
    UnsupportedArchiver(String),
}

impl BackupError {
    /// Create a directory read error for `path`
    pub fn directory_read(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::DirectoryRead {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create an archive creation error
    pub fn archive_failed(command: impl Into<String>, reason: impl ToString) -> Self {
        Self::ArchiveCreation {
            command: command.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether retrying the same archive operation could succeed
    ///
    /// Configuration mistakes and explicit cancellation never go away on
    /// their own, so they are not worth a second attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ArchiveCreation { .. } | Self::ArchiveTimeout { .. } | Self::Io(_)
        )
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for BackupError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BackupError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<regex::Error> for BackupError {
    fn from(err: regex::Error) -> Self {
        Self::Pattern(err.to_string())
    }
}

/// Result type alias for vault-backup operations
pub type BackupResult<T> = Result<T, BackupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BackupError::Config("test error".into());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_directory_read_carries_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such directory");
        let err = BackupError::directory_read("/srv/backups", io_err);
        let message = err.to_string();
        assert!(message.contains("/srv/backups"));
        assert!(message.contains("no such directory"));
    }

    #[test]
    fn test_unsupported_archiver_display() {
        let err = BackupError::UnsupportedArchiver("peaZip".into());
        assert_eq!(err.to_string(), "Unsupported archiver type: peaZip");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retryable() {
        assert!(BackupError::archive_failed("7z", "exit status 2").is_retryable());
        assert!(BackupError::ArchiveTimeout {
            command: "7z".into(),
            timeout: Duration::from_secs(5)
        }
        .is_retryable());
        assert!(!BackupError::Cancelled("shutdown".into()).is_retryable());
    }

    #[test]
    fn test_timeout_keeps_sub_second_precision() {
        let err = BackupError::ArchiveTimeout {
            command: "7z".into(),
            timeout: Duration::from_millis(300),
        };
        assert_eq!(err.to_string(), "Archive creation timed out after 300ms (7z)");
    }

    #[test]
    fn test_prune_interrupted_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = BackupError::PruneInterrupted {
            deleted: vec![PathBuf::from("/b/a.zip"), PathBuf::from("/b/b.zip")],
            source: Box::new(BackupError::directory_read("/b", io_err)),
        };
        assert!(err
            .to_string()
            .starts_with("Pruning stopped after removing 2 backup(s): Failed to read directory /b"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: BackupError = io_err.into();
        assert!(matches!(err, BackupError::Io(_)));
    }
}
