//! vault-backup - timestamped archives of a directory with retention pruning
//!
//! Creates a compressed archive of a vault directory, either with the builtin
//! zip writer or an external archiver (7-Zip, WinRAR, Bandizip), and then
//! prunes older archives by age and by a per-day cap.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration, path management and platform selection
//! - `error`: Custom error types
//! - `pattern`: File name templates and the matchers compiled from them
//! - `archive`: Builtin and external archive creation
//! - `retention`: Age and per-day retention policies
//! - `prune`: Applying deletion plans
//! - `cycle`: One archive-then-prune backup cycle
//! - `display`: Terminal formatting
//! - `cli`: Command handlers for the binary
//!
//! # Example
//!
//! ```rust,ignore
//! use vault_backup::config::{BackupPaths, Platform, Settings};
//! use vault_backup::cycle::BackupCycle;
//!
//! let paths = BackupPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let cycle = BackupCycle::new(settings, Platform::current());
//! let report = cycle.run(&CancellationToken::new()).await?;
//! ```

pub mod archive;
pub mod cli;
pub mod config;
pub mod cycle;
pub mod display;
pub mod error;
pub mod pattern;
pub mod prune;
pub mod retention;

pub use error::{BackupError, BackupResult};
