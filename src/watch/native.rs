// src/watch/native.rs

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::{HotFolderError, Result};
use crate::watch::event::FileEvent;
use crate::watch::source::{ChangeSource, Poll};

/// Change source backed by the platform watch API through `notify`.
///
/// Holds the `RecommendedWatcher` for as long as the subscription is active;
/// dropping or releasing the source stops watching.
pub struct NativeSource {
    folder: PathBuf,
    watcher: RecommendedWatcher,
    event_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    invalidated: bool,
}

impl std::fmt::Debug for NativeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeSource")
            .field("folder", &self.folder)
            .field("invalidated", &self.invalidated)
            .finish_non_exhaustive()
    }
}

impl NativeSource {
    /// Start a non-recursive watch on `folder`.
    ///
    /// Fails if the folder does not exist or the platform refuses the watch;
    /// both indicate misconfiguration and are not retried.
    pub fn register(folder: &Path) -> Result<Self> {
        if !folder.is_dir() {
            return Err(HotFolderError::FolderNotFound(folder.to_path_buf()));
        }

        // Channel from the blocking notify callback into the async world.
        let (event_tx, event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                // The receiver is gone once the source was released.
                let _ = event_tx.send(res);
            },
            Config::default(),
        )
        .map_err(|error| HotFolderError::WatchFailed {
            path: folder.to_path_buf(),
            error,
        })?;

        watcher
            .watch(folder, RecursiveMode::NonRecursive)
            .map_err(|error| HotFolderError::WatchFailed {
                path: folder.to_path_buf(),
                error,
            })?;

        info!(?folder, "native watch registered");

        Ok(Self {
            folder: folder.to_path_buf(),
            watcher,
            event_rx,
            invalidated: false,
        })
    }

    fn absorb(&mut self, message: notify::Result<Event>, out: &mut Vec<FileEvent>) {
        match message {
            Ok(event) => {
                debug!(?event, "received notify event");
                if removes_folder(&event, &self.folder) {
                    warn!(folder = ?self.folder, "watched folder was removed or moved away");
                    self.invalidated = true;
                }
                out.extend(translate_event(&event));
            }
            Err(err) => {
                warn!(folder = ?self.folder, error = %err, "file watch error");
                if !self.folder.is_dir() {
                    self.invalidated = true;
                }
            }
        }
    }
}

impl ChangeSource for NativeSource {
    fn folder(&self) -> &Path {
        &self.folder
    }

    fn poll(
        &mut self,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<Poll>> + Send + '_>> {
        Box::pin(async move {
            let first = match tokio::time::timeout(timeout, self.event_rx.recv()).await {
                Err(_elapsed) => return Ok(Poll::Timeout),
                Ok(None) => {
                    return Err(HotFolderError::SubscriptionInvalidated(self.folder.clone()));
                }
                Ok(Some(message)) => message,
            };

            // Take whatever else is already queued so one poll cycle covers
            // a burst of notifications.
            let mut events = Vec::new();
            self.absorb(first, &mut events);
            while let Ok(message) = self.event_rx.try_recv() {
                self.absorb(message, &mut events);
            }

            Ok(Poll::Events(events))
        })
    }

    fn rearm(&mut self) -> Result<()> {
        if self.invalidated || !self.folder.is_dir() {
            self.invalidated = true;
            return Err(HotFolderError::SubscriptionInvalidated(self.folder.clone()));
        }
        Ok(())
    }

    fn release(mut self: Box<Self>) {
        if let Err(err) = self.watcher.unwatch(&self.folder) {
            debug!(folder = ?self.folder, error = %err, "unwatch failed (folder already gone?)");
        }
        info!(folder = ?self.folder, "native watch released");
    }
}

/// True if the event reports the watched folder itself going away.
fn removes_folder(event: &Event, folder: &Path) -> bool {
    let gone = matches!(
        event.kind,
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From))
    );
    gone && event.paths.iter().any(|p| p == folder)
}

/// Map one `notify` event to zero or more [`FileEvent`]s.
///
/// - `need_rescan` (the queue overflowed) becomes a single `Overflow`.
/// - Renames are split: the old name is `Deleted`, the new name `Created`.
///   When the platform cannot tell which side a rename path is, existence
///   decides.
/// - Access and unknown events are ignored.
pub fn translate_event(event: &Event) -> Vec<FileEvent> {
    if event.need_rescan() {
        return vec![FileEvent::overflow()];
    }

    match &event.kind {
        EventKind::Create(_) => event.paths.iter().map(FileEvent::created).collect(),
        EventKind::Remove(_) => event.paths.iter().map(FileEvent::deleted).collect(),
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => event.paths.iter().map(FileEvent::deleted).collect(),
            RenameMode::To => event.paths.iter().map(FileEvent::created).collect(),
            RenameMode::Both if event.paths.len() >= 2 => vec![
                FileEvent::deleted(&event.paths[0]),
                FileEvent::created(&event.paths[1]),
            ],
            _ => event
                .paths
                .iter()
                .map(|p| {
                    if p.exists() {
                        FileEvent::created(p)
                    } else {
                        FileEvent::deleted(p)
                    }
                })
                .collect(),
        },
        EventKind::Modify(_) => event.paths.iter().map(FileEvent::modified).collect(),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}
