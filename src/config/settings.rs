//! User settings for vault-backup
//!
//! Manages what to back up, where archives go, how they are produced and the
//! retention policies applied after each backup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::paths::BackupPaths;
use super::platform::Platform;
use crate::archive::{ArchiveMethod, ArchiverKind};
use crate::error::{BackupError, BackupResult};
use crate::pattern;
use crate::retention::{OverflowOrder, RetentionPolicy};

/// User settings for vault-backup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Directory to back up
    #[serde(default)]
    pub vault_path: PathBuf,

    /// Archive file name template (`%Y %m %d %H %M %S` placeholders)
    #[serde(default = "default_file_name_format")]
    pub file_name_format: String,

    /// Delete backups older than this many days (0 disables)
    #[serde(default = "default_lifecycle_days")]
    pub lifecycle_days: u32,

    /// Keep at most this many of today's backups (0 disables)
    #[serde(default = "default_backups_per_day")]
    pub backups_per_day: u32,

    /// `none` for the builtin zip writer, or `sevenZip`, `winRAR`, `bandizip`
    #[serde(default = "default_archiver_type")]
    pub archiver_type: String,

    /// Path to the external archiver executable
    #[serde(default)]
    pub archiver_path: PathBuf,

    /// Extension for archives produced by an external archiver
    #[serde(default = "default_archive_file_type")]
    pub archive_file_type: String,

    /// Save directory on Windows hosts
    #[serde(default)]
    pub windows_save_path: PathBuf,

    /// Save directory on Linux and macOS hosts
    #[serde(default)]
    pub unix_save_path: PathBuf,

    /// Seconds to wait for an external archiver (0 waits forever)
    #[serde(default = "default_archiver_timeout_secs")]
    pub archiver_timeout_secs: u64,

    /// Extra attempts after a failed archive
    #[serde(default = "default_retry_times")]
    pub retry_times: u32,

    /// Seconds between archive attempts
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,

    /// How today's backups are ordered before the per-day cap picks surplus
    #[serde(default)]
    pub overflow_order: OverflowOrder,
}

fn default_schema_version() -> u32 {
    1
}

fn default_file_name_format() -> String {
    pattern::default_file_name_format("Vault")
}

fn default_lifecycle_days() -> u32 {
    3
}

fn default_backups_per_day() -> u32 {
    3
}

fn default_archiver_type() -> String {
    "none".to_string()
}

fn default_archive_file_type() -> String {
    "zip".to_string()
}

fn default_archiver_timeout_secs() -> u64 {
    600
}

fn default_retry_times() -> u32 {
    1
}

fn default_retry_interval_secs() -> u64 {
    5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            vault_path: PathBuf::new(),
            file_name_format: default_file_name_format(),
            lifecycle_days: default_lifecycle_days(),
            backups_per_day: default_backups_per_day(),
            archiver_type: default_archiver_type(),
            archiver_path: PathBuf::new(),
            archive_file_type: default_archive_file_type(),
            windows_save_path: PathBuf::new(),
            unix_save_path: PathBuf::new(),
            archiver_timeout_secs: default_archiver_timeout_secs(),
            retry_times: default_retry_times(),
            retry_interval_secs: default_retry_interval_secs(),
            overflow_order: OverflowOrder::default(),
        }
    }
}

impl Settings {
    /// Default settings for a vault, naming archives after its directory
    pub fn for_vault(vault_path: impl Into<PathBuf>) -> Self {
        let vault_path = vault_path.into();
        let vault_name = vault_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "Vault".to_string());

        Self {
            file_name_format: pattern::default_file_name_format(&vault_name),
            vault_path,
            ..Self::default()
        }
    }

    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &BackupPaths) -> Result<Self, BackupError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path).map_err(|e| {
                BackupError::Io(format!("Failed to read settings file: {}", e))
            })?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                BackupError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &BackupPaths) -> Result<(), BackupError> {
        paths.ensure_directories()?;

        let settings_path = paths.settings_file();
        let contents = serde_json::to_string_pretty(self).map_err(|e| {
            BackupError::Config(format!("Failed to serialize settings: {}", e))
        })?;

        std::fs::write(&settings_path, contents).map_err(|e| {
            BackupError::Io(format!("Failed to write settings file: {}", e))
        })?;

        Ok(())
    }

    /// Directory archives are written to and pruned from on `platform`
    ///
    /// Falls back to the directory containing the vault when no save path is
    /// configured for the platform.
    pub fn save_dir(&self, platform: Platform) -> BackupResult<PathBuf> {
        let configured = match platform {
            Platform::Windows => &self.windows_save_path,
            Platform::Unix => &self.unix_save_path,
        };
        if !configured.as_os_str().is_empty() {
            return Ok(configured.clone());
        }

        self.vault_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                BackupError::Config(format!("No {} save path configured", platform))
            })
    }

    /// Resolve the configured archiver into an [`ArchiveMethod`]
    pub fn archive_method(&self) -> BackupResult<ArchiveMethod> {
        match self.archiver_type.trim() {
            "" | "none" | "builtin" => Ok(ArchiveMethod::Builtin),
            other => {
                let kind: ArchiverKind = other.parse()?;
                if self.archiver_path.as_os_str().is_empty() {
                    return Err(BackupError::Config(format!(
                        "archiver_path must be set when archiver_type is {}",
                        other
                    )));
                }
                Ok(ArchiveMethod::External {
                    archiver_path: self.archiver_path.clone(),
                    kind,
                })
            }
        }
    }

    /// Retention policy built from the lifecycle and per-day settings
    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_age_days: self.lifecycle_days,
            max_per_day: self.backups_per_day,
        }
    }

    /// Timeout for external archivers, `None` when disabled
    pub fn archiver_timeout(&self) -> Option<Duration> {
        (self.archiver_timeout_secs > 0).then(|| Duration::from_secs(self.archiver_timeout_secs))
    }

    /// Check the settings needed to run a backup cycle
    pub fn validate(&self) -> BackupResult<()> {
        if self.vault_path.as_os_str().is_empty() {
            return Err(BackupError::Config("vault_path is not set".into()));
        }
        if self.file_name_format.trim().is_empty() {
            return Err(BackupError::Config("file_name_format is empty".into()));
        }
        pattern::compile(&self.file_name_format)?;
        self.archive_method()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.file_name_format, "Vault-Backup-%Y_%m_%d-%H_%M_%S");
        assert_eq!(settings.lifecycle_days, 3);
        assert_eq!(settings.backups_per_day, 3);
        assert!(matches!(
            settings.archive_method().unwrap(),
            ArchiveMethod::Builtin
        ));
    }

    #[test]
    fn test_for_vault_uses_directory_name() {
        let settings = Settings::for_vault("/home/me/Notes");
        assert_eq!(settings.file_name_format, "Notes-Backup-%Y_%m_%d-%H_%M_%S");
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = BackupPaths::with_base_dir(temp_dir.path().to_path_buf());

        let mut settings = Settings::for_vault("/data/vault");
        settings.lifecycle_days = 30;
        settings.archiver_type = "sevenZip".into();
        settings.archiver_path = PathBuf::from("/usr/bin/7z");

        settings.save(&paths).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.lifecycle_days, 30);
        assert_eq!(loaded.vault_path, PathBuf::from("/data/vault"));
        assert!(matches!(
            loaded.archive_method().unwrap(),
            ArchiveMethod::External {
                kind: ArchiverKind::SevenZip,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "vault_path": "/v", "backups_per_day": 0 }"#).unwrap();
        assert_eq!(settings.backups_per_day, 0);
        assert_eq!(settings.lifecycle_days, 3);
        assert_eq!(settings.archiver_timeout_secs, 600);
        assert_eq!(settings.overflow_order, OverflowOrder::Modified);
    }

    #[test]
    fn test_save_dir_per_platform() {
        let mut settings = Settings::for_vault("/data/vault");
        settings.windows_save_path = PathBuf::from(r"D:\backups");
        settings.unix_save_path = PathBuf::from("/srv/backups");

        assert_eq!(
            settings.save_dir(Platform::Windows).unwrap(),
            PathBuf::from(r"D:\backups")
        );
        assert_eq!(
            settings.save_dir(Platform::Unix).unwrap(),
            PathBuf::from("/srv/backups")
        );
    }

    #[test]
    fn test_save_dir_falls_back_to_vault_parent() {
        let settings = Settings::for_vault("/data/vault");
        assert_eq!(
            settings.save_dir(Platform::Unix).unwrap(),
            PathBuf::from("/data")
        );

        let empty = Settings::default();
        assert!(empty.save_dir(Platform::Unix).is_err());
    }

    #[test]
    fn test_unknown_archiver_type() {
        let mut settings = Settings::for_vault("/data/vault");
        settings.archiver_type = "peaZip".into();
        settings.archiver_path = PathBuf::from("/usr/bin/peazip");

        let err = settings.archive_method().unwrap_err();
        assert!(matches!(err, BackupError::UnsupportedArchiver(ref k) if k == "peaZip"));
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_external_archiver_requires_path() {
        let mut settings = Settings::for_vault("/data/vault");
        settings.archiver_type = "bandizip".into();

        assert!(matches!(
            settings.archive_method(),
            Err(BackupError::Config(_))
        ));
    }

    #[test]
    fn test_archiver_timeout() {
        let mut settings = Settings::default();
        assert_eq!(settings.archiver_timeout(), Some(Duration::from_secs(600)));
        settings.archiver_timeout_secs = 0;
        assert_eq!(settings.archiver_timeout(), None);
    }
}
