//! In-process zip writer
//!
//! The archive is built in a staging file next to the destination and renamed
//! into place only after every entry has been written.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{BUILTIN_LABEL, STAGING_SUFFIX};
use crate::error::{BackupError, BackupResult};

/// Staging path used while the archive is being written
pub(crate) fn staging_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(STAGING_SUFFIX);
    dest.with_file_name(name)
}

/// Zip `source` into `dest`, returning the number of entries written
pub(crate) fn write_zip(
    source: &Path,
    dest: &Path,
    cancel: &CancellationToken,
) -> BackupResult<usize> {
    let staging = staging_path(dest);

    let result = write_entries(source, dest, &staging, cancel).and_then(|count| {
        fs::rename(&staging, dest).map_err(|e| {
            BackupError::archive_failed(
                BUILTIN_LABEL,
                format!("failed to move archive into place: {}", e),
            )
        })?;
        Ok(count)
    });

    if result.is_err() && staging.exists() {
        if let Err(e) = fs::remove_file(&staging) {
            warn!(path = %staging.display(), error = %e, "Failed to remove partial archive");
        }
    }

    result
}

fn write_entries(
    source: &Path,
    dest: &Path,
    staging: &Path,
    cancel: &CancellationToken,
) -> BackupResult<usize> {
    let file = File::create(staging).map_err(|e| {
        BackupError::archive_failed(
            BUILTIN_LABEL,
            format!("failed to create {}: {}", staging.display(), e),
        )
    })?;

    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut count = 0;

    for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
        if cancel.is_cancelled() {
            return Err(BackupError::Cancelled(format!(
                "{} of {}",
                BUILTIN_LABEL,
                source.display()
            )));
        }

        let entry = entry.map_err(|e| BackupError::archive_failed(BUILTIN_LABEL, e))?;
        let path = entry.path();

        // The save directory may live inside the vault
        if path == staging || path == dest {
            continue;
        }

        let name = entry_name(source, path)?;
        let file_type = entry.file_type();

        if file_type.is_dir() {
            zip.add_directory(format!("{}/", name), options)
                .map_err(|e| BackupError::archive_failed(BUILTIN_LABEL, e))?;
        } else if file_type.is_file() {
            zip.start_file(name, options)
                .map_err(|e| BackupError::archive_failed(BUILTIN_LABEL, e))?;
            let mut input = File::open(path).map_err(|e| {
                BackupError::archive_failed(
                    BUILTIN_LABEL,
                    format!("failed to read {}: {}", path.display(), e),
                )
            })?;
            io::copy(&mut input, &mut zip)
                .map_err(|e| BackupError::archive_failed(BUILTIN_LABEL, e))?;
        } else {
            debug!(path = %path.display(), "Skipping non-regular entry");
            continue;
        }
        count += 1;
    }

    let file = zip
        .finish()
        .map_err(|e| BackupError::archive_failed(BUILTIN_LABEL, e))?;
    file.sync_all()
        .map_err(|e| BackupError::archive_failed(BUILTIN_LABEL, e))?;

    Ok(count)
}

/// Archive entry name: path relative to the source, `/` separated
fn entry_name(source: &Path, path: &Path) -> BackupResult<String> {
    let relative = path.strip_prefix(source).map_err(|e| {
        BackupError::archive_failed(
            BUILTIN_LABEL,
            format!("{} is outside {}: {}", path.display(), source.display(), e),
        )
    })?;

    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn test_staging_path() {
        assert_eq!(
            staging_path(Path::new("/b/Vault-Backup.zip")),
            PathBuf::from("/b/Vault-Backup.zip.partial")
        );
    }

    #[test]
    fn test_contents_round_trip() {
        let temp = TempDir::new().unwrap();
        let vault = temp.path().join("vault");
        fs::create_dir_all(vault.join("sub")).unwrap();
        fs::write(vault.join("sub/note.md"), "body text").unwrap();

        let dest = temp.path().join("out.zip");
        let count = write_zip(&vault, &dest, &CancellationToken::new()).unwrap();
        assert_eq!(count, 2);
        assert!(!staging_path(&dest).exists());

        let mut archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        let mut contents = String::new();
        archive
            .by_name("sub/note.md")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "body text");
    }

    #[test]
    fn test_destination_inside_source_is_skipped() {
        let temp = TempDir::new().unwrap();
        let vault = temp.path().join("vault");
        fs::create_dir_all(&vault).unwrap();
        fs::write(vault.join("a.md"), "a").unwrap();

        let dest = vault.join("backup.zip");
        write_zip(&vault, &dest, &CancellationToken::new()).unwrap();

        let archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert_eq!(names, vec!["a.md"]);
    }
}
