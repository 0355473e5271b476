//! Backup display formatting
//!
//! Formats backup listings and deletion plans for terminal output.

use chrono::{DateTime, Local};

use crate::retention::{BackupFileEntry, DeletionPlan};

/// Format a list of backups as a table
pub fn format_backup_list(backups: &[BackupFileEntry], now: DateTime<Local>) -> String {
    if backups.is_empty() {
        return "No backups found.".to_string();
    }

    let name_width = backups
        .iter()
        .map(|b| b.file_name().len())
        .max()
        .unwrap_or(4)
        .max(4);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<name_width$}  {:<19}  {:>10}  {:>6}\n",
        "Name",
        "Modified",
        "Size",
        "Age",
        name_width = name_width,
    ));
    output.push_str(&format!(
        "{:-<name_width$}  {:-<19}  {:->10}  {:->6}\n",
        "",
        "",
        "",
        "",
        name_width = name_width,
    ));

    for backup in backups {
        output.push_str(&format!(
            "{:<name_width$}  {:<19}  {:>10}  {:>6}\n",
            backup.file_name(),
            backup.modified.format("%Y-%m-%d %H:%M:%S"),
            format_size(backup.size_bytes),
            format_duration(now.signed_duration_since(backup.modified)),
            name_width = name_width,
        ));
    }

    let total: u64 = backups.iter().map(|b| b.size_bytes).sum();
    output.push_str(&format!(
        "\nTotal: {} backup(s), {}\n",
        backups.len(),
        format_size(total)
    ));

    output
}

/// Format the files a prune would delete
pub fn format_deletion_plan(plan: &DeletionPlan) -> String {
    if plan.is_empty() {
        return "No backups to prune.".to_string();
    }

    let mut output = format!("To be deleted ({}):\n", plan.len());
    for path in plan {
        output.push_str(&format!("  {}\n", path.display()));
    }
    output
}

/// Format a duration in human-readable form
pub fn format_duration(duration: chrono::Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);

    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }

    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }

    format!("{}mo", days / 30)
}

/// Format a file size in human-readable form
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(chrono::Duration::seconds(42)), "42s");
        assert_eq!(format_duration(chrono::Duration::hours(5)), "5h");
        assert_eq!(format_duration(chrono::Duration::days(100)), "3mo");
        assert_eq!(format_duration(chrono::Duration::seconds(-5)), "0s");
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(format_backup_list(&[], Local::now()), "No backups found.");
    }

    #[test]
    fn test_list_contains_rows_and_total() {
        let now = Local::now();
        let backups = vec![BackupFileEntry {
            path: PathBuf::from("/b/Vault-Backup-2024_01_01-00_00_00.zip"),
            modified: now - chrono::Duration::days(2),
            is_file: true,
            size_bytes: 2048,
        }];

        let output = format_backup_list(&backups, now);
        assert!(output.contains("Vault-Backup-2024_01_01-00_00_00.zip"));
        assert!(output.contains("2.0 KB"));
        assert!(output.contains("2d"));
        assert!(output.contains("Total: 1 backup(s)"));
    }

    #[test]
    fn test_deletion_plan() {
        let plan: DeletionPlan = vec![PathBuf::from("/b/old.zip")].into_iter().collect();
        let output = format_deletion_plan(&plan);
        assert!(output.starts_with("To be deleted (1):"));
        assert!(output.contains("/b/old.zip"));
        assert_eq!(format_deletion_plan(&DeletionPlan::new()), "No backups to prune.");
    }
}
