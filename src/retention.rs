//! Retention policies
//!
//! Two independent checks decide which backups to delete:
//!
//! - **Age**: backups whose modification day is older than `max_age_days`
//!   before today.
//! - **Per day**: when more than `max_per_day` backups were modified today,
//!   the surplus beyond the newest `max_per_day`.
//!
//! Only regular files whose name matches the compiled file name template are
//! ever considered. Unfinished staging files from the builtin writer are not
//! backups, even though their names contain a rendered template. Days are calendar days in local time, and the
//! modification time on disk is what counts, never the date in the name.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::archive::STAGING_SUFFIX;
use crate::error::{BackupError, BackupResult};
use crate::pattern::CompiledMatcher;

/// Retention limits; zero disables a limit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub max_age_days: u32,
    pub max_per_day: u32,
}

/// Order of today's backups before the per-day cap removes the first ones
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowOrder {
    /// Directory listing order, as returned by the OS
    Listing,
    /// Oldest modification time first; ties keep listing order
    #[default]
    Modified,
}

/// One directory entry seen during a retention pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFileEntry {
    pub path: PathBuf,
    pub modified: DateTime<Local>,
    pub is_file: bool,
    pub size_bytes: u64,
}

impl BackupFileEntry {
    /// Final path component, lossily decoded
    pub fn file_name(&self) -> Cow<'_, str> {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default()
    }

    /// Calendar day of the last modification
    pub fn modified_day(&self) -> NaiveDate {
        self.modified.date_naive()
    }

    /// An archive the builtin writer never finished
    pub fn is_staging(&self) -> bool {
        self.file_name().ends_with(STAGING_SUFFIX)
    }

    /// A finished regular file named like a backup
    pub fn is_backup(&self, matcher: &CompiledMatcher) -> bool {
        self.is_file && !self.is_staging() && matcher.is_match(&self.file_name())
    }
}

/// Paths selected for deletion during one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionPlan {
    paths: Vec<PathBuf>,
}

impl DeletionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a path unless it is already planned
    pub fn push(&mut self, path: PathBuf) {
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    /// Planned paths in the order they were added
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Number of planned paths
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl Extend<PathBuf> for DeletionPlan {
    fn extend<I: IntoIterator<Item = PathBuf>>(&mut self, iter: I) {
        for path in iter {
            self.push(path);
        }
    }
}

impl FromIterator<PathBuf> for DeletionPlan {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        let mut plan = DeletionPlan::new();
        plan.extend(iter);
        plan
    }
}

impl<'a> IntoIterator for &'a DeletionPlan {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

/// List `dir` in directory order
///
/// Entries whose metadata cannot be read are skipped with a warning; failing
/// to open the directory itself is an error.
pub fn list_entries(dir: &Path) -> BackupResult<Vec<BackupFileEntry>> {
    let read_dir = fs::read_dir(dir).map_err(|e| BackupError::directory_read(dir, e))?;
    let mut entries = Vec::new();

    for entry in read_dir {
        let entry = entry.map_err(|e| BackupError::directory_read(dir, e))?;
        let path = entry.path();

        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        let modified = match metadata.modified() {
            Ok(modified) => DateTime::<Local>::from(modified),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping entry without mtime");
                continue;
            }
        };

        entries.push(BackupFileEntry {
            path,
            modified,
            is_file: metadata.is_file(),
            size_bytes: metadata.len(),
        });
    }

    Ok(entries)
}

/// Backups last modified strictly before `today - max_age_days`
pub fn select_expired(
    entries: &[BackupFileEntry],
    matcher: &CompiledMatcher,
    max_age_days: u32,
    today: NaiveDate,
) -> Vec<PathBuf> {
    if max_age_days == 0 {
        return Vec::new();
    }
    let Some(cutoff) = today.checked_sub_days(Days::new(u64::from(max_age_days))) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter(|entry| entry.is_backup(matcher))
        .filter(|entry| entry.modified_day() < cutoff)
        .map(|entry| entry.path.clone())
        .collect()
}

/// Today's backups beyond the newest `max_per_day`
pub fn select_overflow(
    entries: &[BackupFileEntry],
    matcher: &CompiledMatcher,
    max_per_day: u32,
    today: NaiveDate,
    order: OverflowOrder,
) -> Vec<PathBuf> {
    if max_per_day == 0 {
        return Vec::new();
    }

    let mut todays: Vec<&BackupFileEntry> = entries
        .iter()
        .filter(|entry| entry.is_backup(matcher))
        .filter(|entry| entry.modified_day() == today)
        .collect();

    if order == OverflowOrder::Modified {
        todays.sort_by_key(|entry| entry.modified);
    }

    let surplus = todays.len().saturating_sub(max_per_day as usize);
    todays
        .into_iter()
        .take(surplus)
        .map(|entry| entry.path.clone())
        .collect()
}

/// Runs the retention policies against one backup directory
#[derive(Debug, Clone)]
pub struct RetentionEngine {
    dir: PathBuf,
    matcher: CompiledMatcher,
    policy: RetentionPolicy,
    order: OverflowOrder,
}

impl RetentionEngine {
    /// Create an engine for the backups in `dir`
    pub fn new(
        dir: impl Into<PathBuf>,
        matcher: CompiledMatcher,
        policy: RetentionPolicy,
        order: OverflowOrder,
    ) -> Self {
        Self {
            dir: dir.into(),
            matcher,
            policy,
            order,
        }
    }

    /// The directory being pruned
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Backups in the directory, in listing order
    pub fn backups(&self) -> BackupResult<Vec<BackupFileEntry>> {
        Ok(list_entries(&self.dir)?
            .into_iter()
            .filter(|entry| entry.is_backup(&self.matcher))
            .collect())
    }

    /// Plan the age policy on a fresh listing
    pub fn expired_plan(&self, today: NaiveDate) -> BackupResult<DeletionPlan> {
        if self.policy.max_age_days == 0 {
            return Ok(DeletionPlan::new());
        }
        let entries = list_entries(&self.dir)?;
        let plan: DeletionPlan =
            select_expired(&entries, &self.matcher, self.policy.max_age_days, today)
                .into_iter()
                .collect();
        debug!(
            dir = %self.dir.display(),
            template = self.matcher.template(),
            selected = plan.len(),
            "Age policy evaluated"
        );
        Ok(plan)
    }

    /// Plan the per-day policy on a fresh listing
    pub fn overflow_plan(&self, today: NaiveDate) -> BackupResult<DeletionPlan> {
        if self.policy.max_per_day == 0 {
            return Ok(DeletionPlan::new());
        }
        let entries = list_entries(&self.dir)?;
        let plan: DeletionPlan = select_overflow(
            &entries,
            &self.matcher,
            self.policy.max_per_day,
            today,
            self.order,
        )
        .into_iter()
        .collect();
        debug!(
            dir = %self.dir.display(),
            template = self.matcher.template(),
            selected = plan.len(),
            "Per-day policy evaluated"
        );
        Ok(plan)
    }

    /// Both policies over a single listing, merged without duplicates
    pub fn plan(&self, today: NaiveDate) -> BackupResult<DeletionPlan> {
        let entries = list_entries(&self.dir)?;
        let mut plan: DeletionPlan =
            select_expired(&entries, &self.matcher, self.policy.max_age_days, today)
                .into_iter()
                .collect();
        plan.extend(select_overflow(
            &entries,
            &self.matcher,
            self.policy.max_per_day,
            today,
            self.order,
        ));
        Ok(plan)
    }
}
