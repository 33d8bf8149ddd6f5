// src/watch/source.rs

//! Pluggable source of raw change notifications.
//!
//! The folder watcher talks to a `ChangeSource` instead of a concrete watch
//! API. Production code uses [`NativeSource`](crate::watch::native::NativeSource)
//! or [`PollingSource`](crate::watch::polling::PollingSource); tests can
//! provide a scripted source that injects arbitrary event sequences,
//! including overflows.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::types::DetectorMode;
use crate::watch::event::FileEvent;
use crate::watch::native::NativeSource;
use crate::watch::polling::PollingSource;

/// Outcome of one bounded wait on a change source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll {
    /// Nothing arrived within the timeout.
    Timeout,
    /// Everything that was queued when the wait ended, in arrival order.
    Events(Vec<FileEvent>),
}

/// An active watch subscription on one folder.
pub trait ChangeSource: Send {
    fn folder(&self) -> &Path;

    /// Wait at most `timeout` for change notifications.
    fn poll(
        &mut self,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<Poll>> + Send + '_>>;

    /// Resume watching after a batch was handled.
    ///
    /// Fails with `SubscriptionInvalidated` when the subscription can no
    /// longer deliver events, typically because the folder was removed.
    fn rearm(&mut self) -> Result<()>;

    /// Release the subscription. Called once, after the client was closed.
    fn release(self: Box<Self>) {}
}

/// Register a subscription of the requested kind on `folder`.
pub fn open_source(
    mode: DetectorMode,
    folder: &Path,
    fs: Arc<dyn FileSystem>,
) -> Result<Box<dyn ChangeSource>> {
    match mode {
        DetectorMode::Native => Ok(Box::new(NativeSource::register(folder)?)),
        DetectorMode::Polling => Ok(Box::new(PollingSource::register(folder, fs)?)),
    }
}
