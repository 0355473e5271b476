//! Terminal output formatting

pub mod backup;

pub use backup::{format_backup_list, format_deletion_plan, format_duration, format_size};
