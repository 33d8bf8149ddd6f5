// src/engine/dispatcher.rs

//! Bounded-concurrency dispatch of one batch to the client.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, error, trace, warn};

use crate::engine::client::{invoke, FileProcessingClient};
use crate::engine::naming::{named, worker_name};
use crate::engine::stats::RunStatistics;
use crate::engine::stop::StopSignal;
use crate::errors::{HotFolderError, Result};
use crate::watch::path_utils::file_name_str;
use crate::watch::{Batch, FileAction};

/// Tuning for [`BatchDispatcher`].
#[derive(Debug, Clone, Copy)]
pub struct DispatchSettings {
    /// Maximum number of callbacks running at the same time.
    pub concurrency: usize,
    /// How long to wait on a single task before re-checking the stop signal.
    pub poll_interval: Duration,
    /// How long running tasks get to finish once the batch is shut down.
    pub grace_period: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkOutcome {
    Completed,
    /// Never started: the pool was closed after a failure.
    Abandoned,
}

type WorkHandle = JoinHandle<Result<WorkOutcome>>;

/// Runs the client callbacks for a batch on a pool of at most `concurrency`
/// concurrent tasks.
///
/// A fresh pool is created per batch. Waiting is done task by task with a
/// timeout of one poll interval, re-checking the stop signal in between, so
/// a stop request is noticed even while a slow callback is running. Running
/// callbacks are never interrupted.
///
/// A stop does not cancel the batch: every file already handed to the pool
/// still runs. The dispatcher only bounds how long it waits for them; what is
/// left after the grace period keeps going in the background.
pub struct BatchDispatcher {
    label: String,
    client: Arc<dyn FileProcessingClient>,
    stop: StopSignal,
    stats: Arc<RunStatistics>,
    settings: DispatchSettings,
}

impl std::fmt::Debug for BatchDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchDispatcher")
            .field("label", &self.label)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl BatchDispatcher {
    pub fn new(
        label: impl Into<String>,
        client: Arc<dyn FileProcessingClient>,
        stop: StopSignal,
        stats: Arc<RunStatistics>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            label: label.into(),
            client,
            stop,
            stats,
            settings,
        }
    }

    pub fn stats(&self) -> &Arc<RunStatistics> {
        &self.stats
    }

    /// Dispatch every entry of `batch` and wait for all of them.
    ///
    /// Returns the number of callbacks that completed. Fails with the first
    /// callback error (wrapped in `CallbackFailed`) or with `WorkerAborted` if
    /// a task panicked; the pool is closed first so tasks that have not
    /// started are abandoned, and running ones get the grace period.
    ///
    /// Returns `Stopped` if the stop signal was raised while waiting. The pool
    /// stays open in that case and the remaining tasks get the grace period.
    pub async fn run(&self, batch: Batch) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }

        let workers = self.settings.concurrency.max(1);
        let pool = Arc::new(Semaphore::new(workers));
        debug!(
            watcher = %self.label,
            files = batch.len(),
            workers,
            "dispatching batch"
        );

        let mut pending: VecDeque<(PathBuf, WorkHandle)> = VecDeque::with_capacity(batch.len());
        for (seq, (path, action)) in batch.into_iter().enumerate() {
            let name = worker_name(
                &self.label,
                seq,
                &file_name_str(&path).unwrap_or_default(),
            );
            let work = run_one(
                Arc::clone(&pool),
                Arc::clone(&self.client),
                Arc::clone(&self.stats),
                path.clone(),
                action,
            );
            pending.push_back((path, tokio::spawn(named(name, work))));
        }
        self.stats.record_batch();

        let mut completed = 0;
        while let Some((path, mut handle)) = pending.pop_front() {
            let joined = loop {
                if self.stop.is_set() {
                    debug!(watcher = %self.label, "stop requested while waiting on batch");
                    pending.push_front((path, handle));
                    self.drain(pending).await;
                    return Err(HotFolderError::Stopped);
                }
                match timeout(self.settings.poll_interval, &mut handle).await {
                    Ok(joined) => break joined,
                    Err(_elapsed) => {
                        trace!(watcher = %self.label, ?path, "task still running");
                    }
                }
            };

            match joined {
                Ok(Ok(WorkOutcome::Completed)) => completed += 1,
                Ok(Ok(WorkOutcome::Abandoned)) => {}
                Ok(Err(err)) => {
                    error!(watcher = %self.label, ?path, error = %err, "callback failed; aborting batch");
                    self.shutdown(&pool, pending).await;
                    return Err(err);
                }
                Err(join_err) => {
                    error!(watcher = %self.label, ?path, error = %join_err, "worker task ended abnormally");
                    self.shutdown(&pool, pending).await;
                    return Err(HotFolderError::WorkerAborted {
                        label: format!("{} ({:?})", self.label, path),
                        message: join_err.to_string(),
                    });
                }
            }
        }

        Ok(completed)
    }

    /// Close the pool and give the remaining tasks the grace period.
    async fn shutdown(&self, pool: &Semaphore, remaining: VecDeque<(PathBuf, WorkHandle)>) {
        pool.close();
        self.drain(remaining).await;
    }

    /// Wait for `remaining` until the grace period runs out, then detach.
    async fn drain(&self, remaining: VecDeque<(PathBuf, WorkHandle)>) {
        if remaining.is_empty() {
            return;
        }

        let deadline = Instant::now() + self.settings.grace_period;
        let mut abandoned = Vec::new();
        let mut detached = 0usize;

        for (path, handle) in remaining {
            match timeout_at(deadline, handle).await {
                Ok(Ok(Ok(WorkOutcome::Completed))) => {}
                Ok(Ok(Ok(WorkOutcome::Abandoned))) => abandoned.push(path),
                Ok(Ok(Err(err))) => {
                    warn!(watcher = %self.label, ?path, error = %err, "task failed while the batch was winding down");
                }
                Ok(Err(join_err)) => {
                    warn!(watcher = %self.label, ?path, error = %join_err, "task ended abnormally while the batch was winding down");
                }
                Err(_elapsed) => {
                    detached += 1;
                    warn!(watcher = %self.label, ?path, "task outlived the grace period; leaving it to finish in the background");
                }
            }
        }

        if !abandoned.is_empty() {
            warn!(
                watcher = %self.label,
                count = abandoned.len(),
                files = ?abandoned,
                "batch shut down before these files were started"
            );
        }
        if detached > 0 {
            debug!(watcher = %self.label, detached, "tasks detached after grace period");
        }
    }
}

/// One worker task: take a pool slot, then run the callback.
async fn run_one(
    pool: Arc<Semaphore>,
    client: Arc<dyn FileProcessingClient>,
    stats: Arc<RunStatistics>,
    path: PathBuf,
    action: FileAction,
) -> Result<WorkOutcome> {
    let Ok(_permit) = pool.acquire_owned().await else {
        return Ok(WorkOutcome::Abandoned);
    };

    debug!(?path, %action, "invoking client");
    invoke(client.as_ref(), action, &path)
        .await
        .map_err(|error| HotFolderError::CallbackFailed {
            action,
            path: path.clone(),
            error,
        })?;

    stats.record(action);
    Ok(WorkOutcome::Completed)
}
