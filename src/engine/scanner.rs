// src/engine/scanner.rs

//! Supervisor running the data-folder watcher next to the stop-folder watcher.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::engine::client::FileProcessingClient;
use crate::engine::folder_watcher::{FolderWatcher, WatcherSettings};
use crate::engine::naming::named;
use crate::engine::stop::{StopFolderClient, StopSignal};
use crate::errors::{HotFolderError, Result};
use crate::watch::FileFilter;

/// Settings for a [`DualFolderScanner`] session.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    /// The data folder and how to process it.
    pub watch: WatcherSettings,
    /// Folder observed for the stop sentinel.
    pub stop_folder: PathBuf,
    /// Name of the sentinel file.
    pub stop_file: String,
}

enum Finished {
    Primary(Result<()>),
    StopFolder(Result<()>),
}

/// Runs the primary watcher and the stop-folder watcher as two tasks.
///
/// Both share one [`StopSignal`]. The stop-folder watcher raises it when the
/// sentinel appears; Ctrl-C or any other holder of the signal can raise it
/// too. A fatal error in either watcher raises the flag, cancels the other
/// and is returned from [`run`](Self::run).
pub struct DualFolderScanner {
    primary: FolderWatcher,
    stop_watcher: FolderWatcher,
    stop: StopSignal,
    stop_file: String,
    poll_interval: Duration,
    grace_period: Duration,
}

impl std::fmt::Debug for DualFolderScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualFolderScanner")
            .field("primary", &self.primary)
            .field("stop_watcher", &self.stop_watcher)
            .field("stop_file", &self.stop_file)
            .finish_non_exhaustive()
    }
}

impl DualFolderScanner {
    pub fn new(
        settings: ScanSettings,
        client: Arc<dyn FileProcessingClient>,
        stop: StopSignal,
    ) -> Self {
        let ScanSettings {
            watch,
            stop_folder,
            stop_file,
        } = settings;

        let stop_settings = WatcherSettings::new(stop_folder)
            .with_poll_interval(watch.poll_interval)
            .with_grace_period(watch.grace_period)
            .with_detector(watch.detector)
            .with_concurrency(1)
            .with_filter(FileFilter::accept_all());
        let stop_client = Arc::new(StopFolderClient::new(stop.clone(), stop_file.clone()));

        let poll_interval = watch.poll_interval;
        let grace_period = watch.grace_period;
        let primary = FolderWatcher::new("hotfolder", watch, client, stop.clone());
        let stop_watcher = FolderWatcher::new("stopfolder", stop_settings, stop_client, stop.clone());

        Self {
            primary,
            stop_watcher,
            stop,
            stop_file,
            poll_interval,
            grace_period,
        }
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn primary(&self) -> &FolderWatcher {
        &self.primary
    }

    pub fn stop_watcher(&self) -> &FolderWatcher {
        &self.stop_watcher
    }

    /// Run both watchers until the session stops.
    ///
    /// - Primary finishes first (cleanly or not): the stop-folder watcher has
    ///   nothing left to signal and is cancelled right away.
    /// - Stop-folder watcher finishes first: the flag is raised and the
    ///   primary is awaited until its in-flight callbacks are done.
    pub async fn run(self) -> Result<()> {
        let Self {
            primary,
            stop_watcher,
            stop,
            stop_file,
            poll_interval,
            grace_period,
        } = self;

        let sentinel_path = stop_watcher.folder().join(&stop_file);
        if sentinel_path.exists() {
            warn!(path = ?sentinel_path, "stop file already present; the scan will stop after the initial sync");
        }

        info!(
            folder = ?primary.folder(),
            stop_folder = ?stop_watcher.folder(),
            "scan session started"
        );

        let primary_label = primary.label().to_string();
        let stop_label = stop_watcher.label().to_string();
        let mut primary_task = tokio::spawn(named(primary_label.clone(), primary.run()));
        let mut stop_task = tokio::spawn(named(stop_label.clone(), stop_watcher.run()));

        let mut stop_seen = false;
        let first = loop {
            tokio::select! {
                joined = &mut primary_task => break Finished::Primary(flatten(&primary_label, joined)),
                joined = &mut stop_task => break Finished::StopFolder(flatten(&stop_label, joined)),
                _ = tokio::time::sleep(poll_interval) => {
                    if stop.is_set() && !stop_seen {
                        stop_seen = true;
                        info!("stop requested; watchers exit at their next checkpoint");
                    }
                }
            }
        };

        let result = match first {
            Finished::Primary(primary_result) => {
                stop.set();
                let stop_result =
                    cancel_within(stop_task, &stop_label, poll_interval + grace_period).await;
                match (primary_result, stop_result) {
                    (Err(err), other) => {
                        if let Err(other_err) = other {
                            warn!(watcher = %stop_label, error = %other_err, "stop-folder watcher also failed");
                        }
                        Err(err)
                    }
                    (Ok(()), other) => other,
                }
            }
            Finished::StopFolder(stop_result) => {
                if let Err(err) = &stop_result {
                    error!(watcher = %stop_label, error = %err, "stop-folder watcher failed; stopping scan");
                }
                stop.set();
                debug!(watcher = %primary_label, "waiting for primary watcher to finish in-flight work");
                let primary_result = flatten(&primary_label, primary_task.await);
                match (stop_result, primary_result) {
                    (Err(err), other) => {
                        if let Err(other_err) = other {
                            warn!(watcher = %primary_label, error = %other_err, "primary watcher also failed");
                        }
                        Err(err)
                    }
                    (Ok(()), other) => other,
                }
            }
        };

        match &result {
            Ok(()) => info!("scan session finished"),
            Err(err) => error!(error = %err, "scan session failed"),
        }
        result
    }
}

/// Give a watcher task `bound` to observe the stop flag, then abort it.
async fn cancel_within(mut task: JoinHandle<Result<()>>, label: &str, bound: Duration) -> Result<()> {
    match timeout(bound, &mut task).await {
        Ok(joined) => flatten(label, joined),
        Err(_elapsed) => {
            warn!(watcher = %label, "watcher did not stop in time; aborting it");
            task.abort();
            Ok(())
        }
    }
}

fn flatten(label: &str, joined: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    match joined {
        Ok(result) => result,
        Err(err) if err.is_cancelled() => Ok(()),
        Err(err) => Err(HotFolderError::WorkerAborted {
            label: label.to_string(),
            message: err.to_string(),
        }),
    }
}
