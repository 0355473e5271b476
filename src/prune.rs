//! Applies deletion plans
//!
//! Each path is removed on its own. A failure is recorded and the rest of
//! the plan still runs; nothing is rolled back. A path that is already gone
//! counts as handled, since both retention policies may pick the same file.

use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::error::BackupError;
use crate::retention::DeletionPlan;

/// Outcome of applying a [`DeletionPlan`]
#[derive(Debug, Default)]
pub struct PruneReport {
    /// Files removed by this run
    pub deleted: Vec<PathBuf>,
    /// Files that no longer existed when their turn came
    pub already_absent: Vec<PathBuf>,
    /// Files that could not be removed
    pub failed: Vec<BackupError>,
}

impl PruneReport {
    /// Whether every planned path is gone
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// One-line summary
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("{} deleted", self.deleted.len())];
        if !self.already_absent.is_empty() {
            parts.push(format!("{} already gone", self.already_absent.len()));
        }
        if !self.failed.is_empty() {
            parts.push(format!("{} failed", self.failed.len()));
        }
        parts.join(", ")
    }
}

/// Deletes the files in a plan
#[derive(Debug, Clone, Copy, Default)]
pub struct Pruner;

impl Pruner {
    pub fn new() -> Self {
        Self
    }

    /// Remove every path in `plan`, recording what happened to each
    ///
    /// Never fails as a whole; per-file errors end up in
    /// [`PruneReport::failed`].
    pub fn apply_plan(&self, plan: &DeletionPlan) -> PruneReport {
        let mut report = PruneReport::default();

        for path in plan {
            match std::fs::remove_file(path) {
                Ok(()) => {
                    info!(path = %path.display(), "Backup removed");
                    report.deleted.push(path.clone());
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    report.already_absent.push(path.clone());
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove backup");
                    report.failed.push(BackupError::Deletion {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_apply_plan_deletes_files() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.zip");
        let b = temp.path().join("b.zip");
        fs::write(&a, "a").unwrap();
        fs::write(&b, "b").unwrap();

        let plan: DeletionPlan = vec![a.clone(), b.clone()].into_iter().collect();
        let report = Pruner::new().apply_plan(&plan);

        assert_eq!(report.deleted, vec![a.clone(), b.clone()]);
        assert!(report.is_clean());
        assert!(!a.exists());
        assert!(!b.exists());
    }

    #[test]
    fn test_second_deletion_is_already_absent() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.zip");
        fs::write(&a, "a").unwrap();

        let plan: DeletionPlan = std::iter::once(a.clone()).collect();
        let pruner = Pruner::new();
        let first = pruner.apply_plan(&plan);
        let second = pruner.apply_plan(&plan);

        assert_eq!(first.deleted, vec![a.clone()]);
        assert!(second.deleted.is_empty());
        assert_eq!(second.already_absent, vec![a]);
        assert!(second.is_clean());
        assert_eq!(second.summary(), "0 deleted, 1 already gone");
    }

    #[test]
    fn test_failure_does_not_abort_batch() {
        let temp = TempDir::new().unwrap();
        // remove_file refuses directories
        let dir = temp.path().join("looks-like-a-backup.zip");
        fs::create_dir(&dir).unwrap();
        let file = temp.path().join("real.zip");
        fs::write(&file, "x").unwrap();

        let plan: DeletionPlan = vec![dir.clone(), file.clone()].into_iter().collect();
        let report = Pruner::new().apply_plan(&plan);

        assert_eq!(report.failed.len(), 1);
        assert!(matches!(&report.failed[0], BackupError::Deletion { path, .. } if path == &dir));
        assert_eq!(report.deleted, vec![file.clone()]);
        assert!(!file.exists());
        assert!(!report.is_clean());
        assert_eq!(report.summary(), "1 deleted, 1 failed");
    }
}
