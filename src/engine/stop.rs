// src/engine/stop.rs

//! Shared stop flag and the stop-folder client that raises it.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::engine::client::{ClientFuture, FileProcessingClient};
use crate::errors::{HotFolderError, Result};

/// Default name of the sentinel file that stops a scan session.
pub const STOP_FILE_NAME: &str = "stoprunning";

/// Process-wide stop flag shared by both watchers and the supervisor.
///
/// Monotonic: once set it is never cleared. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Returns true if this call was the one that set it.
    pub fn set(&self) -> bool {
        !self.flag.swap(true, Ordering::SeqCst)
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Cancellation checkpoint: `Err(Stopped)` once the flag is raised.
    pub fn check(&self) -> Result<()> {
        if self.is_set() {
            Err(HotFolderError::Stopped)
        } else {
            Ok(())
        }
    }
}

/// Client for the stop folder: raises the [`StopSignal`] when the sentinel
/// file is added or written to. Every other file is ignored.
#[derive(Debug, Clone)]
pub struct StopFolderClient {
    signal: StopSignal,
    sentinel: String,
}

impl StopFolderClient {
    pub fn new(signal: StopSignal, sentinel: impl Into<String>) -> Self {
        Self {
            signal,
            sentinel: sentinel.into(),
        }
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }
}

impl StopFolderClient {
    fn observe(&self, path: &Path) {
        let is_sentinel = path
            .file_name()
            .is_some_and(|name| name == self.sentinel.as_str());
        if is_sentinel {
            if self.signal.set() {
                info!(?path, "stop file detected; stopping scan");
            }
        } else {
            debug!(?path, "ignoring non-sentinel file in stop folder");
        }
    }
}

impl FileProcessingClient for StopFolderClient {
    fn file_added<'a>(&'a self, path: &'a Path) -> ClientFuture<'a> {
        self.observe(path);
        Box::pin(async { Ok(()) })
    }

    // `echo > stoprunning` is a create plus a write, coalesced to a modification.
    fn file_modified<'a>(&'a self, path: &'a Path) -> ClientFuture<'a> {
        self.observe(path);
        Box::pin(async { Ok(()) })
    }
}
