//! One backup cycle
//!
//! Archive first, then prune: the age policy runs on its own directory
//! snapshot, then the per-day policy on a fresh one. Pruning is skipped
//! entirely when no new archive could be created, so a failing archiver can
//! never leave the save directory without a backup.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::archive::{create_archive, ArchiveOptions};
use crate::config::{Platform, Settings};
use crate::error::{BackupError, BackupResult};
use crate::pattern;
use crate::prune::{PruneReport, Pruner};
use crate::retention::{DeletionPlan, RetentionEngine};

/// Results of the two retention passes
#[derive(Debug, Default)]
pub struct PruneOutcome {
    pub expired: PruneReport,
    pub overflow: PruneReport,
}

impl PruneOutcome {
    pub fn summary(&self) -> String {
        format!(
            "age policy: {}; per-day policy: {}",
            self.expired.summary(),
            self.overflow.summary()
        )
    }
}

/// Results of a full cycle
#[derive(Debug)]
pub struct CycleReport {
    /// The archive created by this cycle
    pub archive: PathBuf,
    /// Attempts needed to create it
    pub attempts: u32,
    pub pruned: PruneOutcome,
}

/// Runs backup cycles for one configuration
#[derive(Debug, Clone)]
pub struct BackupCycle {
    settings: Settings,
    platform: Platform,
}

impl BackupCycle {
    pub fn new(settings: Settings, platform: Platform) -> Self {
        Self { settings, platform }
    }

    /// Save directory for the injected platform
    pub fn save_dir(&self) -> BackupResult<PathBuf> {
        self.settings.save_dir(self.platform)
    }

    /// Archive path for a cycle started at `now`
    pub fn destination(&self, now: &NaiveDateTime) -> BackupResult<PathBuf> {
        let method = self.settings.archive_method()?;
        let name = format!(
            "{}.{}",
            pattern::render(&self.settings.file_name_format, now),
            method.extension(&self.settings.archive_file_type)
        );
        Ok(self.save_dir()?.join(name))
    }

    /// Retention engine over the save directory
    pub fn retention_engine(&self) -> BackupResult<RetentionEngine> {
        Ok(RetentionEngine::new(
            self.save_dir()?,
            pattern::compile(&self.settings.file_name_format)?,
            self.settings.retention_policy(),
            self.settings.overflow_order,
        ))
    }

    /// Create a new archive, retrying failed attempts
    ///
    /// Returns the archive path and the number of attempts it took.
    pub async fn create_backup(&self, cancel: &CancellationToken) -> BackupResult<(PathBuf, u32)> {
        self.settings.validate()?;
        let method = self.settings.archive_method()?;

        let save_dir = self.save_dir()?;
        std::fs::create_dir_all(&save_dir).map_err(|e| {
            BackupError::Io(format!(
                "Failed to create save directory {}: {}",
                save_dir.display(),
                e
            ))
        })?;

        let dest = self.destination(&Local::now().naive_local())?;
        let options = ArchiveOptions::new(self.settings.archiver_timeout(), cancel.clone());
        let max_attempts = self.settings.retry_times.saturating_add(1);
        let interval = Duration::from_secs(self.settings.retry_interval_secs);

        let mut attempt = 1;
        loop {
            match create_archive(&self.settings.vault_path, &dest, &method, &options).await {
                Ok(()) => return Ok((dest, attempt)),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!(attempt, max_attempts, error = %e, "Backup failed, retrying");
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            return Err(BackupError::Cancelled("waiting to retry backup".into()));
                        }
                        _ = tokio::time::sleep(interval) => {}
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Both retention plans merged, without deleting anything
    pub fn plan_prune(&self, today: NaiveDate) -> BackupResult<DeletionPlan> {
        self.retention_engine()?.plan(today)
    }

    /// Apply the age policy, then the per-day policy
    ///
    /// If the per-day listing fails after the age pass removed files, the
    /// error is [`BackupError::PruneInterrupted`] and names those files.
    pub fn prune(&self, today: NaiveDate) -> BackupResult<PruneOutcome> {
        let engine = self.retention_engine()?;
        let pruner = Pruner::new();

        let expired = pruner.apply_plan(&engine.expired_plan(today)?);
        let outcome = finish_prune(&pruner, expired, engine.overflow_plan(today))?;
        info!(dir = %engine.dir().display(), "Retention applied: {}", outcome.summary());
        Ok(outcome)
    }

    /// Create a backup, then prune
    pub async fn run(&self, cancel: &CancellationToken) -> BackupResult<CycleReport> {
        let (archive, attempts) = self.create_backup(cancel).await?;
        let pruned = self.prune(Local::now().date_naive())?;

        Ok(CycleReport {
            archive,
            attempts,
            pruned,
        })
    }
}

fn finish_prune(
    pruner: &Pruner,
    expired: PruneReport,
    overflow_plan: BackupResult<DeletionPlan>,
) -> BackupResult<PruneOutcome> {
    match overflow_plan {
        Ok(plan) => Ok(PruneOutcome {
            expired,
            overflow: pruner.apply_plan(&plan),
        }),
        Err(e) if expired.deleted.is_empty() => Err(e),
        Err(e) => {
            warn!(error = %e, "Per-day policy failed after age policy: {}", expired.summary());
            Err(BackupError::PruneInterrupted {
                deleted: expired.deleted,
                source: Box::new(e),
            })
        }
    }
}
