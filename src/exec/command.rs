// src/exec/command.rs

//! Running the configured per-file command.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::watch::FileAction;

/// Placeholder in the command line replaced by the file path.
pub const FILE_PLACEHOLDER: &str = "{file}";

/// How one command invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Success,
    Failed(i32),
    TimedOut,
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Success)
    }
}

/// Expand the command template for `file`.
pub fn render_command(template: &str, file: &Path) -> String {
    template.replace(FILE_PLACEHOLDER, &shell_quote(&file.to_string_lossy()))
}

#[cfg(windows)]
fn shell_quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[cfg(not(windows))]
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Run `template` through the platform shell for one file.
///
/// The file is also exposed as `HOTFOLDER_FILE`, the callback name as
/// `HOTFOLDER_ACTION`. With a `limit`, a process still running after it is
/// killed and reported as `TimedOut`. Spawn failures are returned as errors.
pub async fn run_for_file(
    template: &str,
    file: &Path,
    action: FileAction,
    limit: Option<Duration>,
) -> Result<CommandOutcome> {
    let line = render_command(template, file);
    info!(?file, %action, cmd = %line, "starting command");

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&line);
        c
    };

    cmd.env("HOTFOLDER_FILE", file)
        .env("HOTFOLDER_ACTION", action.as_str())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning command for {:?}", file))?;

    // Always consume output so buffers don't fill; log at debug.
    if let Some(stdout) = child.stdout.take() {
        let name = file.display().to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(file = %name, "stdout: {}", line);
            }
        });
    }
    if let Some(stderr) = child.stderr.take() {
        let name = file.display().to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(file = %name, "stderr: {}", line);
            }
        });
    }

    let waited = match limit {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => status,
            Err(_elapsed) => {
                warn!(?file, limit_ms = limit.as_millis() as u64, "command timed out; killing it");
                if let Err(e) = child.kill().await {
                    warn!(?file, error = %e, "failed to kill timed out command");
                }
                return Ok(CommandOutcome::TimedOut);
            }
        },
        None => child.wait().await,
    };

    let status = waited.with_context(|| format!("waiting for command of {:?}", file))?;
    let code = status.code().unwrap_or(-1);
    info!(?file, exit_code = code, success = status.success(), "command exited");

    Ok(if status.success() {
        CommandOutcome::Success
    } else {
        CommandOutcome::Failed(code)
    })
}
