//! Configuration module for vault-backup
//!
//! This module provides configuration management including:
//! - XDG-compliant config path resolution
//! - User settings persistence
//! - Host platform selection

pub mod paths;
pub mod platform;
pub mod settings;

pub use paths::BackupPaths;
pub use platform::Platform;
pub use settings::Settings;
