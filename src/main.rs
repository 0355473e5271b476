use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use vault_backup::cli::{handle_backup_command, BackupCommands};
use vault_backup::config::{BackupPaths, Platform, Settings};

#[derive(Parser)]
#[command(
    name = "vault-backup",
    author = "Kaylee Beyene",
    version,
    about = "Timestamped vault archives with retention pruning",
    long_about = "vault-backup archives a directory into a timestamped file, using \
                  a builtin zip writer or an external archiver, and prunes older \
                  archives by age and by a per-day cap."
)]
struct Cli {
    /// Directory holding config.json
    #[arg(long, global = true, env = "VAULT_BACKUP_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration for a vault
    Init {
        /// Directory to back up
        vault: PathBuf,
        /// Where archives are saved (defaults to the vault's parent directory)
        #[arg(short, long)]
        save_path: Option<PathBuf>,
        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration and paths
    Config,

    #[command(flatten)]
    Backup(BackupCommands),
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "vault_backup=debug"
    } else {
        "vault_backup=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let paths = match cli.config_dir {
        Some(dir) => BackupPaths::with_base_dir(dir),
        None => BackupPaths::new()?,
    };
    let platform = Platform::current();

    match cli.command {
        Some(Commands::Init {
            vault,
            save_path,
            force,
        }) => {
            if paths.is_initialized() && !force {
                println!(
                    "Already initialized: {}",
                    paths.settings_file().display()
                );
                println!("Run again with --force to overwrite.");
                return Ok(());
            }

            let mut settings = Settings::for_vault(vault);
            if let Some(save_path) = save_path {
                match platform {
                    Platform::Windows => settings.windows_save_path = save_path,
                    Platform::Unix => settings.unix_save_path = save_path,
                }
            }
            settings.save(&paths)?;
            println!("Configuration written to {}", paths.settings_file().display());
        }
        Some(Commands::Config) => {
            let settings = Settings::load_or_create(&paths)?;
            println!("vault-backup Configuration");
            println!("==========================");
            println!("Config dir:      {}", paths.base_dir().display());
            println!("Config file:     {}", paths.settings_file().display());
            println!("Platform:        {}", platform);
            println!("Vault:           {}", settings.vault_path.display());
            match settings.save_dir(platform) {
                Ok(dir) => println!("Save directory:  {}", dir.display()),
                Err(e) => println!("Save directory:  ({})", e),
            }
            println!();
            println!("Settings:");
            println!("  File name format: {}", settings.file_name_format);
            println!("  Lifecycle days:   {}", settings.lifecycle_days);
            println!("  Backups per day:  {}", settings.backups_per_day);
            match settings.archive_method() {
                Ok(method) => println!("  Archiver:         {}", method.describe()),
                Err(e) => println!("  Archiver:         ({})", e),
            }
            println!("  Overflow order:   {:?}", settings.overflow_order);
        }
        Some(Commands::Backup(cmd)) => {
            let settings = Settings::load_or_create(&paths)?;

            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, cancelling");
                    on_signal.cancel();
                }
            });

            handle_backup_command(&settings, platform, &cancel, cmd).await?;
        }
        None => {
            println!("vault-backup - timestamped vault archives");
            println!();
            println!("Run 'vault-backup --help' for usage information.");
            println!("Run 'vault-backup init <VAULT>' to get started.");
        }
    }

    Ok(())
}
