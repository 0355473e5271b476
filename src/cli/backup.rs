//! Backup CLI commands
//!
//! Implements CLI commands for creating, listing and pruning backups.

use chrono::Local;
use clap::Subcommand;
use tokio_util::sync::CancellationToken;

use crate::config::platform::Platform;
use crate::config::settings::Settings;
use crate::cycle::BackupCycle;
use crate::display;
use crate::error::BackupResult;

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Create a backup, then apply the retention policies
    Run,

    /// Create a backup without pruning
    Create,

    /// List backups in the save directory
    List,

    /// Delete backups according to the retention policies
    Prune {
        /// Delete instead of only showing what would be deleted
        #[arg(short, long)]
        force: bool,
    },
}

/// Handle a backup command
pub async fn handle_backup_command(
    settings: &Settings,
    platform: Platform,
    cancel: &CancellationToken,
    cmd: BackupCommands,
) -> BackupResult<()> {
    let cycle = BackupCycle::new(settings.clone(), platform);

    match cmd {
        BackupCommands::Run => {
            println!("Creating backup of {}...", settings.vault_path.display());
            let report = cycle.run(cancel).await?;
            println!("Backup created: {}", report.archive.display());
            if report.attempts > 1 {
                println!("(succeeded after {} attempts)", report.attempts);
            }
            println!("Pruned: {}", report.pruned.summary());
            print_failures(&report.pruned.expired.failed);
            print_failures(&report.pruned.overflow.failed);
        }

        BackupCommands::Create => {
            println!("Creating backup of {}...", settings.vault_path.display());
            let (archive, _) = cycle.create_backup(cancel).await?;
            println!("Backup created: {}", archive.display());
        }

        BackupCommands::List => {
            let engine = cycle.retention_engine()?;
            let backups = engine.backups()?;

            println!("Backups in {}", engine.dir().display());
            println!();
            println!("{}", display::format_backup_list(&backups, Local::now()));
        }

        BackupCommands::Prune { force } => {
            let today = Local::now().date_naive();
            let policy = settings.retention_policy();

            println!("Prune Summary");
            println!("=============");
            println!(
                "Retention policy: {} day lifecycle, {} per day (0 = disabled)",
                policy.max_age_days, policy.max_per_day
            );

            if !force {
                let plan = cycle.plan_prune(today)?;
                println!("{}", display::format_deletion_plan(&plan));
                if !plan.is_empty() {
                    println!();
                    println!("To delete these backups, run again with --force flag:");
                    println!("  vault-backup prune --force");
                }
                return Ok(());
            }

            let outcome = cycle.prune(today)?;
            println!("{}", outcome.summary());
            print_failures(&outcome.expired.failed);
            print_failures(&outcome.overflow.failed);
        }
    }

    Ok(())
}

fn print_failures(failures: &[crate::error::BackupError]) {
    for failure in failures {
        eprintln!("  {}", failure);
    }
}
