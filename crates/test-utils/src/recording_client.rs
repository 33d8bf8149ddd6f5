use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use hotfolder::engine::{ClientFuture, FileProcessingClient, StopSignal};
use hotfolder::watch::FileAction;

/// One callback invocation, recorded when it started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub action: FileAction,
    pub path: PathBuf,
}

impl Call {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// A client that:
/// - records every callback in start order, with timestamps
/// - optionally sleeps in each callback
/// - optionally fails for one file name
/// - optionally raises a stop signal after N completed callbacks
/// - tracks how many callbacks ran at the same time
#[derive(Debug, Default)]
pub struct RecordingClient {
    calls: Mutex<Vec<Call>>,
    finished_at: Mutex<Vec<Instant>>,
    closes: AtomicUsize,
    completed: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Duration,
    fail_on: Option<String>,
    stop_after: Option<(usize, StopSignal)>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_on(mut self, file_name: &str) -> Self {
        self.fail_on = Some(file_name.to_string());
        self
    }

    pub fn stop_after(mut self, completed: usize, signal: StopSignal) -> Self {
        self.stop_after = Some((completed, signal));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// File names in callback start order.
    pub fn file_names(&self) -> Vec<String> {
        self.calls().iter().map(Call::file_name).collect()
    }

    pub fn actions_for(&self, file_name: &str) -> Vec<FileAction> {
        self.calls()
            .into_iter()
            .filter(|c| c.file_name() == file_name)
            .map(|c| c.action)
            .collect()
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn finished_at(&self) -> Vec<Instant> {
        self.finished_at.lock().unwrap().clone()
    }

    async fn handle(&self, action: FileAction, path: &Path) -> anyhow::Result<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().unwrap().push(Call {
            action,
            path: path.to_path_buf(),
        });

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.finished_at.lock().unwrap().push(Instant::now());
        let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((limit, signal)) = &self.stop_after {
            if done >= *limit {
                signal.set();
            }
        }

        let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        if let (Some(fail_on), Some(name)) = (&self.fail_on, name) {
            if *fail_on == name {
                anyhow::bail!("refusing to process {name}");
            }
        }
        Ok(())
    }
}

impl FileProcessingClient for RecordingClient {
    fn file_added<'a>(&'a self, path: &'a Path) -> ClientFuture<'a> {
        Box::pin(self.handle(FileAction::Added, path))
    }

    fn file_modified<'a>(&'a self, path: &'a Path) -> ClientFuture<'a> {
        Box::pin(self.handle(FileAction::Modified, path))
    }

    fn file_deleted<'a>(&'a self, path: &'a Path) -> ClientFuture<'a> {
        Box::pin(self.handle(FileAction::Deleted, path))
    }

    fn close(&self) -> ClientFuture<'_> {
        Box::pin(async move {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}
