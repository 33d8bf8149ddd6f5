// src/engine/client.rs

//! Per-file processing contract consumed by the watchers.
//!
//! The watcher only knows three callbacks plus a teardown hook. Each callback
//! is expected to catch its own expected failures (validation errors, remote
//! service rejections, ...) and turn them into bookkeeping such as moving the
//! file to a failed folder. An `Err` returned from a callback is treated as
//! fatal and aborts the watch loop.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::watch::FileAction;

/// Boxed future returned by every client method.
pub type ClientFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// Callbacks invoked by a folder watcher.
///
/// All methods default to a no-op so implementations override only the
/// events they care about.
pub trait FileProcessingClient: Send + Sync {
    fn file_added<'a>(&'a self, path: &'a Path) -> ClientFuture<'a> {
        let _ = path;
        Box::pin(async { Ok(()) })
    }

    fn file_modified<'a>(&'a self, path: &'a Path) -> ClientFuture<'a> {
        let _ = path;
        Box::pin(async { Ok(()) })
    }

    fn file_deleted<'a>(&'a self, path: &'a Path) -> ClientFuture<'a> {
        let _ = path;
        Box::pin(async { Ok(()) })
    }

    /// Teardown hook, invoked exactly once when the watcher shuts down.
    fn close(&self) -> ClientFuture<'_> {
        Box::pin(async { Ok(()) })
    }
}

/// Route `action` to the matching callback.
pub fn invoke<'a>(
    client: &'a dyn FileProcessingClient,
    action: FileAction,
    path: &'a Path,
) -> ClientFuture<'a> {
    match action {
        FileAction::Added => client.file_added(path),
        FileAction::Modified => client.file_modified(path),
        FileAction::Deleted => client.file_deleted(path),
    }
}
