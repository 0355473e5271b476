//! Archive creation
//!
//! Produces one compressed archive of the vault directory, either in-process
//! with the zip crate or by running an external archiver.
//!
//! # Guarantees
//!
//! - The call resolves only once the archive is fully written or has failed,
//!   so retention pruning never runs while a fresh backup is still pending.
//! - On failure, timeout or cancellation no partial archive is left behind.
//!
//! # Example
//!
//! ```rust,ignore
//! use vault_backup::archive::{create_archive, ArchiveMethod, ArchiveOptions};
//!
//! create_archive(&vault, &dest, &ArchiveMethod::Builtin, &ArchiveOptions::default()).await?;
//! ```

mod builtin;
mod external;

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{BackupError, BackupResult};

pub use external::ArchiverKind;

/// Label used in errors and logs for the in-process writer
pub(crate) const BUILTIN_LABEL: &str = "builtin zip";

/// Suffix of the builtin writer's staging file
///
/// A file carrying it is an unfinished archive, left over if a run was
/// killed before the final rename.
pub const STAGING_SUFFIX: &str = ".partial";

/// How an archive gets produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveMethod {
    /// In-process zip writer
    Builtin,
    /// External archiver executable
    External {
        archiver_path: PathBuf,
        kind: ArchiverKind,
    },
}

impl ArchiveMethod {
    /// File extension for archives produced by this method
    ///
    /// The builtin writer always produces zip files; external archivers use
    /// the configured archive file type.
    pub fn extension(&self, archive_file_type: &str) -> String {
        match self {
            ArchiveMethod::Builtin => "zip".to_string(),
            ArchiveMethod::External { .. } => {
                let ext = archive_file_type.trim().trim_start_matches('.');
                if ext.is_empty() {
                    "zip".to_string()
                } else {
                    ext.to_string()
                }
            }
        }
    }

    /// Short human readable description
    pub fn describe(&self) -> String {
        match self {
            ArchiveMethod::Builtin => BUILTIN_LABEL.to_string(),
            ArchiveMethod::External {
                archiver_path,
                kind,
            } => format!("{} ({})", kind.display_name(), archiver_path.display()),
        }
    }
}

/// Knobs for a single archive run
#[derive(Debug, Clone, Default)]
pub struct ArchiveOptions {
    /// Give up on an external archiver after this long
    pub timeout: Option<Duration>,
    /// Abort the run when cancelled
    pub cancel: CancellationToken,
}

impl ArchiveOptions {
    pub fn new(timeout: Option<Duration>, cancel: CancellationToken) -> Self {
        Self { timeout, cancel }
    }
}

/// Create an archive of `source_dir` at `dest_file`
pub async fn create_archive(
    source_dir: &Path,
    dest_file: &Path,
    method: &ArchiveMethod,
    options: &ArchiveOptions,
) -> BackupResult<()> {
    if !source_dir.is_dir() {
        return Err(BackupError::archive_failed(
            method.describe(),
            format!("source directory {} does not exist", source_dir.display()),
        ));
    }

    info!(
        source = %source_dir.display(),
        dest = %dest_file.display(),
        method = %method.describe(),
        "Creating archive"
    );

    match method {
        ArchiveMethod::Builtin => {
            let source = source_dir.to_path_buf();
            let dest = dest_file.to_path_buf();
            let cancel = options.cancel.clone();
            let entries =
                tokio::task::spawn_blocking(move || builtin::write_zip(&source, &dest, &cancel))
                    .await
                    .map_err(|e| BackupError::archive_failed(BUILTIN_LABEL, e))??;
            info!(entries, dest = %dest_file.display(), "Archive created");
        }
        ArchiveMethod::External {
            archiver_path,
            kind,
        } => {
            external::run(archiver_path, *kind, source_dir, dest_file, options).await?;
            info!(dest = %dest_file.display(), "Archive created by {}", kind.display_name());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_extension() {
        assert_eq!(ArchiveMethod::Builtin.extension("7z"), "zip");

        let external = ArchiveMethod::External {
            archiver_path: PathBuf::from("/usr/bin/7z"),
            kind: ArchiverKind::SevenZip,
        };
        assert_eq!(external.extension("7z"), "7z");
        assert_eq!(external.extension(".rar"), "rar");
        assert_eq!(external.extension(""), "zip");
    }

    #[tokio::test]
    async fn test_builtin_archive_of_tree() {
        let temp = TempDir::new().unwrap();
        let vault = temp.path().join("vault");
        fs::create_dir_all(vault.join("notes/daily")).unwrap();
        fs::create_dir_all(vault.join("empty")).unwrap();
        fs::write(vault.join("index.md"), "# Index").unwrap();
        fs::write(vault.join("notes/daily/2024-01-01.md"), "hello").unwrap();

        let dest = temp.path().join("Vault-Backup.zip");
        create_archive(&vault, &dest, &ArchiveMethod::Builtin, &ArchiveOptions::default())
            .await
            .unwrap();

        assert!(dest.exists());
        let archive = zip::ZipArchive::new(fs::File::open(&dest).unwrap()).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert!(names.contains(&"index.md"));
        assert!(names.contains(&"notes/daily/2024-01-01.md"));
        assert!(names.contains(&"empty/"));
    }

    #[tokio::test]
    async fn test_missing_source_fails() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("out.zip");

        let err = create_archive(
            &temp.path().join("missing"),
            &dest,
            &ArchiveMethod::Builtin,
            &ArchiveOptions::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, BackupError::ArchiveCreation { .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_cancelled_builtin_leaves_nothing() {
        let temp = TempDir::new().unwrap();
        let vault = temp.path().join("vault");
        fs::create_dir_all(&vault).unwrap();
        fs::write(vault.join("a.md"), "a").unwrap();

        let options = ArchiveOptions::default();
        options.cancel.cancel();

        let dest = temp.path().join("out.zip");
        let err = create_archive(&vault, &dest, &ArchiveMethod::Builtin, &options)
            .await
            .unwrap_err();

        assert!(matches!(err, BackupError::Cancelled(_)));
        assert!(!dest.exists());
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    }
}
