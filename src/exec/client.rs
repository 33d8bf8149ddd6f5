// src/exec/client.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::engine::{ClientFuture, FileProcessingClient};
use crate::exec::command::{run_for_file, CommandOutcome};
use crate::exec::relocate::relocate;
use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::FileAction;

/// How [`CommandClient`] processes files.
#[derive(Debug, Clone)]
pub struct CommandSettings {
    /// Shell command template; `{file}` is replaced by the quoted file path.
    pub cmd: String,
    /// Kill the command after this long and treat the file as failed.
    pub timeout: Option<Duration>,
    /// Successfully processed files are moved here.
    pub processed_folder: PathBuf,
    /// Files whose command failed are moved here.
    pub failed_folder: PathBuf,
    /// Whether the command sees `file_modified` as its own action. When
    /// false a modified file is handed over as `file_added`.
    pub process_modified: bool,
}

/// Processing client that runs a shell command per file and sorts the file
/// into the processed or failed folder depending on the outcome.
///
/// Command failures, timeouts and spawn errors are this client's own
/// bookkeeping and never escape as errors. Only a file that cannot be moved
/// out of the hot folder at all is reported as a failure, since it would
/// otherwise be picked up again forever.
#[derive(Debug)]
pub struct CommandClient {
    settings: CommandSettings,
    fs: Arc<dyn FileSystem>,
    processed: AtomicU64,
    failed: AtomicU64,
}

impl CommandClient {
    pub fn new(settings: CommandSettings) -> Self {
        Self::with_fs(settings, Arc::new(RealFileSystem))
    }

    pub fn with_fs(settings: CommandSettings, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            settings,
            fs,
            processed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// (processed, failed) counts so far.
    pub fn totals(&self) -> (u64, u64) {
        (
            self.processed.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
        )
    }

    async fn process(&self, path: &Path, action: FileAction) -> Result<()> {
        if !self.fs.is_file(path) {
            debug!(?path, %action, "file no longer present; skipping");
            return Ok(());
        }

        let outcome = match run_for_file(&self.settings.cmd, path, action, self.settings.timeout).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(?path, error = %err, "command could not be run");
                CommandOutcome::Failed(-1)
            }
        };

        let (target_dir, counter) = if outcome.is_success() {
            (&self.settings.processed_folder, &self.processed)
        } else {
            (&self.settings.failed_folder, &self.failed)
        };

        let moved = relocate(self.fs.as_ref(), path, target_dir)
            .with_context(|| format!("moving {:?} out of the hot folder", path))?;
        counter.fetch_add(1, Ordering::Relaxed);

        if outcome.is_success() {
            info!(?path, to = ?moved, "file processed");
        } else {
            warn!(?path, to = ?moved, ?outcome, "file processing failed");
        }
        Ok(())
    }
}

impl FileProcessingClient for CommandClient {
    fn file_added<'a>(&'a self, path: &'a Path) -> ClientFuture<'a> {
        Box::pin(self.process(path, FileAction::Added))
    }

    fn file_modified<'a>(&'a self, path: &'a Path) -> ClientFuture<'a> {
        Box::pin(async move {
            // Anything still in the hot folder has not been processed yet, and a
            // file written in place arrives as a modification.
            let action = if self.settings.process_modified {
                FileAction::Modified
            } else {
                FileAction::Added
            };
            self.process(path, action).await
        })
    }

    fn file_deleted<'a>(&'a self, path: &'a Path) -> ClientFuture<'a> {
        Box::pin(async move {
            debug!(?path, "file left the hot folder");
            Ok(())
        })
    }

    fn close(&self) -> ClientFuture<'_> {
        Box::pin(async move {
            let (processed, failed) = self.totals();
            info!(processed, failed, "command client closed");
            Ok(())
        })
    }
}
