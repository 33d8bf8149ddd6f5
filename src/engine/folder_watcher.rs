// src/engine/folder_watcher.rs

//! The run loop for one watched folder.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::engine::client::FileProcessingClient;
use crate::engine::dispatcher::{BatchDispatcher, DispatchSettings};
use crate::engine::stats::RunStatistics;
use crate::engine::stop::StopSignal;
use crate::errors::{HotFolderError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::DetectorMode;
use crate::watch::{open_source, Batch, ChangeDetector, ChangeSource, Detection, FileFilter, Poll};

/// Lifecycle of a [`FolderWatcher`], published on its state channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    /// Delivering the full folder contents (startup or after an overflow).
    Syncing,
    Watching,
    Stopping,
    Closed,
}

/// Everything a watcher needs to know about its folder.
#[derive(Debug, Clone)]
pub struct WatcherSettings {
    pub folder: PathBuf,
    pub poll_interval: Duration,
    pub concurrency: usize,
    pub grace_period: Duration,
    pub detector: DetectorMode,
    pub filter: FileFilter,
}

impl WatcherSettings {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);
    pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            concurrency: 1,
            grace_period: Self::DEFAULT_GRACE_PERIOD,
            detector: DetectorMode::default(),
            filter: FileFilter::accept_all(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    pub fn with_detector(mut self, detector: DetectorMode) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_filter(mut self, filter: FileFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Watches one folder and feeds its changes to a client.
///
/// Lifecycle: register the subscription, deliver the current folder
/// contents oldest-first, then loop { poll with timeout, coalesce, dispatch,
/// re-arm }. An overflow sends the loop back to a full sync. The loop ends
/// when the stop signal is observed (clean) or on a fatal error; either way
/// the client is closed exactly once, then the subscription is released.
pub struct FolderWatcher {
    label: String,
    settings: WatcherSettings,
    fs: Arc<dyn FileSystem>,
    client: Arc<dyn FileProcessingClient>,
    stop: StopSignal,
    detector: ChangeDetector,
    dispatcher: BatchDispatcher,
    state_tx: watch::Sender<WatcherState>,
}

impl std::fmt::Debug for FolderWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderWatcher")
            .field("label", &self.label)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl FolderWatcher {
    pub fn new(
        label: impl Into<String>,
        settings: WatcherSettings,
        client: Arc<dyn FileProcessingClient>,
        stop: StopSignal,
    ) -> Self {
        Self::with_fs(label, settings, client, stop, Arc::new(RealFileSystem))
    }

    pub fn with_fs(
        label: impl Into<String>,
        settings: WatcherSettings,
        client: Arc<dyn FileProcessingClient>,
        stop: StopSignal,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        let label = label.into();
        let detector = ChangeDetector::new(
            settings.folder.clone(),
            Arc::clone(&fs),
            settings.filter.clone(),
        );
        let dispatcher = BatchDispatcher::new(
            label.clone(),
            Arc::clone(&client),
            stop.clone(),
            Arc::new(RunStatistics::new()),
            DispatchSettings {
                concurrency: settings.concurrency,
                poll_interval: settings.poll_interval,
                grace_period: settings.grace_period,
            },
        );
        let (state_tx, _) = watch::channel(WatcherState::Idle);

        Self {
            label,
            settings,
            fs,
            client,
            stop,
            detector,
            dispatcher,
            state_tx,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn folder(&self) -> &Path {
        &self.settings.folder
    }

    pub fn stats(&self) -> Arc<RunStatistics> {
        Arc::clone(self.dispatcher.stats())
    }

    /// Observe lifecycle transitions, e.g. to wait until watching started.
    pub fn subscribe_state(&self) -> watch::Receiver<WatcherState> {
        self.state_tx.subscribe()
    }

    /// Register the configured change source and run until stopped.
    ///
    /// Returns `Ok(())` when the stop signal ended the loop. A folder that
    /// cannot be watched fails immediately (the client is still closed).
    pub async fn run(self) -> Result<()> {
        let opened = open_source(
            self.settings.detector,
            &self.settings.folder,
            Arc::clone(&self.fs),
        );
        match opened {
            Ok(source) => self.run_with_source(source).await,
            Err(err) => {
                error!(watcher = %self.label, folder = ?self.settings.folder, error = %err, "cannot watch folder");
                self.finish(None, Err(err)).await
            }
        }
    }

    /// Run against an already registered change source.
    pub async fn run_with_source(self, mut source: Box<dyn ChangeSource>) -> Result<()> {
        info!(
            watcher = %self.label,
            folder = ?self.settings.folder,
            concurrency = self.settings.concurrency,
            poll_ms = self.settings.poll_interval.as_millis() as u64,
            "watcher started"
        );
        let outcome = self.drive(source.as_mut()).await;
        self.finish(Some(source), outcome).await
    }

    async fn drive(&self, source: &mut dyn ChangeSource) -> Result<()> {
        loop {
            self.set_state(WatcherState::Syncing);
            self.stop.check()?;
            let batch = self.detector.initial_sync()?;
            info!(watcher = %self.label, files = batch.len(), "syncing folder contents");
            self.dispatch(batch).await?;
            source.rearm()?;

            self.set_state(WatcherState::Watching);
            self.watch(source).await?;
            warn!(watcher = %self.label, "watch queue overflowed; re-syncing folder");
        }
    }

    /// Steady-state loop. Returns `Ok(())` only when an overflow requires a
    /// full re-sync.
    async fn watch(&self, source: &mut dyn ChangeSource) -> Result<()> {
        loop {
            self.stop.check()?;

            let events = match source.poll(self.settings.poll_interval).await? {
                Poll::Timeout => continue,
                Poll::Events(events) => events,
            };
            debug!(watcher = %self.label, events = events.len(), "poll returned events");

            match self.detector.collect(events, &self.stop)? {
                Detection::Overflow => return Ok(()),
                Detection::Batch(batch) => {
                    self.dispatch(batch).await?;
                    source.rearm()?;
                }
            }
        }
    }

    async fn dispatch(&self, batch: Batch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let files = batch.len();
        let completed = self.dispatcher.run(batch).await?;
        info!(
            watcher = %self.label,
            files,
            completed,
            totals = %self.dispatcher.stats().snapshot(),
            "batch handled"
        );
        Ok(())
    }

    /// Close the client, then release the subscription.
    async fn finish(
        self,
        source: Option<Box<dyn ChangeSource>>,
        outcome: Result<()>,
    ) -> Result<()> {
        self.set_state(WatcherState::Stopping);
        let closed = self.client.close().await;
        if let Some(source) = source {
            source.release();
        }
        self.set_state(WatcherState::Closed);

        let totals = self.dispatcher.stats().snapshot();
        match (outcome, closed) {
            (Ok(()) | Err(HotFolderError::Stopped), Ok(())) => {
                info!(watcher = %self.label, %totals, "watcher stopped");
                Ok(())
            }
            (Ok(()) | Err(HotFolderError::Stopped), Err(close_err)) => {
                error!(watcher = %self.label, error = %close_err, "closing client failed");
                Err(HotFolderError::Other(close_err.context("closing client")))
            }
            (Err(err), closed) => {
                if let Err(close_err) = closed {
                    warn!(watcher = %self.label, error = %close_err, "closing client failed after fatal error");
                }
                error!(watcher = %self.label, error = %err, %totals, "watcher aborted");
                Err(err)
            }
        }
    }

    fn set_state(&self, state: WatcherState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(watcher = %self.label, ?previous, ?state, "watcher state");
        }
    }
}
