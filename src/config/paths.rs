//! Path management for vault-backup
//!
//! Resolves where the settings file lives. The backup save directories
//! themselves are user settings (see [`super::settings::Settings`]).
//!
//! ## Path Resolution Order
//!
//! 1. `VAULT_BACKUP_CONFIG_DIR` environment variable (if set)
//! 2. Unix (Linux/macOS): `$XDG_CONFIG_HOME/vault-backup` or `~/.config/vault-backup`
//! 3. Windows: `%APPDATA%\vault-backup`

use std::path::PathBuf;

use crate::error::BackupError;

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "VAULT_BACKUP_CONFIG_DIR";

/// Manages all paths used by vault-backup
#[derive(Debug, Clone)]
pub struct BackupPaths {
    /// Base directory for configuration
    base_dir: PathBuf,
}

impl BackupPaths {
    /// Create a new BackupPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, BackupError> {
        let base_dir = if let Ok(custom) = std::env::var(CONFIG_DIR_ENV) {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create BackupPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.config/vault-backup/ or equivalent)
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Ensure the configuration directory exists
    pub fn ensure_directories(&self) -> Result<(), BackupError> {
        std::fs::create_dir_all(&self.base_dir).map_err(|e| {
            BackupError::Io(format!(
                "Failed to create config directory {}: {}",
                self.base_dir.display(),
                e
            ))
        })
    }

    /// Check if vault-backup has been initialized (config file exists)
    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}

/// Resolve the default config directory path based on platform
#[cfg(not(windows))]
fn resolve_default_path() -> Result<PathBuf, BackupError> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg).join("vault-backup"));
    }
    let home = std::env::var("HOME")
        .map_err(|_| BackupError::Config("HOME environment variable not set".into()))?;
    Ok(PathBuf::from(home).join(".config").join("vault-backup"))
}

/// Resolve the default config directory path based on platform
#[cfg(windows)]
fn resolve_default_path() -> Result<PathBuf, BackupError> {
    let appdata = std::env::var("APPDATA")
        .map_err(|_| BackupError::Config("Could not determine APPDATA directory".into()))?;
    Ok(PathBuf::from(appdata).join("vault-backup"))
}
