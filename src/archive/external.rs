//! External archiver invocation
//!
//! Every supported archiver is driven by the same code path; the kinds only
//! differ in their argument template. Arguments are handed to the process
//! individually, so paths with spaces stay a single argument. The quoted
//! [`ArchiverKind::command_line`] form exists for logs and error messages.

use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::process::{Output, Stdio};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::ArchiveOptions;
use crate::error::{BackupError, BackupResult};

/// One slot in an argument template
#[derive(Debug, Clone, Copy)]
enum Arg {
    Flag(&'static str),
    Dest,
    Source,
    /// Everything inside the source directory
    SourceContents,
}

const SEVEN_ZIP_ARGS: &[Arg] = &[Arg::Flag("a"), Arg::Dest, Arg::Source];
const WIN_RAR_ARGS: &[Arg] = &[
    Arg::Flag("a"),
    Arg::Flag("-ep1"),
    Arg::Flag("-rh"),
    Arg::Dest,
    Arg::SourceContents,
];
const BANDIZIP_ARGS: &[Arg] = &[Arg::Flag("c"), Arg::Dest, Arg::Source];

/// Supported external archivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiverKind {
    #[serde(rename = "sevenZip")]
    SevenZip,
    #[serde(rename = "winRAR")]
    WinRar,
    #[serde(rename = "bandizip")]
    Bandizip,
}

impl ArchiverKind {
    pub const ALL: [ArchiverKind; 3] = [
        ArchiverKind::SevenZip,
        ArchiverKind::WinRar,
        ArchiverKind::Bandizip,
    ];

    /// Configuration name
    pub fn name(&self) -> &'static str {
        match self {
            ArchiverKind::SevenZip => "sevenZip",
            ArchiverKind::WinRar => "winRAR",
            ArchiverKind::Bandizip => "bandizip",
        }
    }

    /// Product name for messages
    pub fn display_name(&self) -> &'static str {
        match self {
            ArchiverKind::SevenZip => "7-Zip",
            ArchiverKind::WinRar => "WinRAR",
            ArchiverKind::Bandizip => "Bandizip",
        }
    }

    fn template(&self) -> &'static [Arg] {
        match self {
            ArchiverKind::SevenZip => SEVEN_ZIP_ARGS,
            ArchiverKind::WinRar => WIN_RAR_ARGS,
            ArchiverKind::Bandizip => BANDIZIP_ARGS,
        }
    }

    /// Expand the template; the flag marks path arguments
    fn expand(&self, dest: &Path, source: &Path) -> Vec<(OsString, bool)> {
        self.template()
            .iter()
            .map(|arg| match arg {
                Arg::Flag(flag) => (OsString::from(*flag), false),
                Arg::Dest => (dest.as_os_str().to_os_string(), true),
                Arg::Source => (source.as_os_str().to_os_string(), true),
                Arg::SourceContents => {
                    let mut contents = source.as_os_str().to_os_string();
                    contents.push("\\*");
                    (contents, true)
                }
            })
            .collect()
    }

    /// Process arguments for archiving `source` into `dest`
    pub fn args(&self, dest: &Path, source: &Path) -> Vec<OsString> {
        self.expand(dest, source)
            .into_iter()
            .map(|(arg, _)| arg)
            .collect()
    }

    /// Full command with every path double quoted
    pub fn command_line(&self, archiver_path: &Path, dest: &Path, source: &Path) -> String {
        let mut line = quote(&archiver_path.to_string_lossy());
        for (arg, is_path) in self.expand(dest, source) {
            line.push(' ');
            let arg = arg.to_string_lossy();
            if is_path {
                line.push_str(&quote(&arg));
            } else {
                line.push_str(&arg);
            }
        }
        line
    }
}

impl fmt::Display for ArchiverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ArchiverKind {
    type Err = BackupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArchiverKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BackupError::UnsupportedArchiver(s.to_string()))
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value)
}

enum Outcome {
    Finished(std::io::Result<Output>),
    TimedOut,
    Cancelled,
}

async fn wait_for(child: Child, timeout: Option<Duration>, cancel: &CancellationToken) -> Outcome {
    // Dropping the output future drops the child, which kills it
    let output = child.wait_with_output();
    let bounded = async move {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, output).await.ok(),
            None => Some(output.await),
        }
    };

    tokio::select! {
        _ = cancel.cancelled() => Outcome::Cancelled,
        result = bounded => match result {
            Some(result) => Outcome::Finished(result),
            None => Outcome::TimedOut,
        },
    }
}

/// Run `kind` to archive `source` into `dest`
pub(crate) async fn run(
    archiver_path: &Path,
    kind: ArchiverKind,
    source: &Path,
    dest: &Path,
    options: &ArchiveOptions,
) -> BackupResult<()> {
    let command = kind.command_line(archiver_path, dest, source);
    debug!(%command, "Launching archiver");

    let existed_before = dest.exists();

    let child = Command::new(archiver_path)
        .args(kind.args(dest, source))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| BackupError::archive_failed(&command, format!("failed to launch: {}", e)))?;

    let result = match wait_for(child, options.timeout, &options.cancel).await {
        Outcome::Finished(Ok(output)) => {
            log_output(&output);
            if output.status.success() {
                Ok(())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(BackupError::archive_failed(
                    &command,
                    format!("{}: {}", output.status, stderr.trim()),
                ))
            }
        }
        Outcome::Finished(Err(e)) => Err(BackupError::archive_failed(&command, e)),
        Outcome::TimedOut => Err(BackupError::ArchiveTimeout {
            command: command.clone(),
            timeout: options.timeout.unwrap_or_default(),
        }),
        Outcome::Cancelled => Err(BackupError::Cancelled(command.clone())),
    };

    if result.is_err() && !existed_before && dest.exists() {
        if let Err(e) = std::fs::remove_file(dest) {
            warn!(path = %dest.display(), error = %e, "Failed to remove partial archive");
        }
    }

    result
}

fn log_output(output: &Output) {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stdout.trim().is_empty() {
        debug!(stdout = %stdout.trim(), "Archiver output");
    }
    if !stderr.trim().is_empty() {
        debug!(stderr = %stderr.trim(), "Archiver error output");
    }
}
