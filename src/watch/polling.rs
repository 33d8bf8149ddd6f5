// src/watch/polling.rs

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tracing::{debug, info};

use crate::errors::{HotFolderError, Result};
use crate::fs::FileSystem;
use crate::watch::event::FileEvent;
use crate::watch::listing::FolderSnapshot;
use crate::watch::source::{ChangeSource, Poll};

/// Change source that diffs full folder listings instead of relying on
/// platform notifications.
///
/// Each poll waits out the interval, lists the folder and compares it with
/// the previous listing:
/// - a path not seen before is `Created`
/// - a path whose modification time changed is `Modified`
/// - a path that disappeared is `Deleted`
///
/// Created/modified events come out oldest first, like a folder sync.
#[derive(Debug)]
pub struct PollingSource {
    folder: PathBuf,
    fs: Arc<dyn FileSystem>,
    known: HashMap<PathBuf, SystemTime>,
}

impl PollingSource {
    /// Take the baseline listing of `folder`.
    pub fn register(folder: &Path, fs: Arc<dyn FileSystem>) -> Result<Self> {
        if !fs.is_dir(folder) {
            return Err(HotFolderError::FolderNotFound(folder.to_path_buf()));
        }
        let baseline = FolderSnapshot::capture(fs.as_ref(), folder)?;
        info!(?folder, files = baseline.len(), "polling watch registered");

        Ok(Self {
            folder: folder.to_path_buf(),
            known: baseline.to_index(),
            fs,
        })
    }

    /// Diff the folder against the previous listing right now.
    pub fn scan(&mut self) -> Result<Poll> {
        if !self.fs.is_dir(&self.folder) {
            return Err(HotFolderError::SubscriptionInvalidated(self.folder.clone()));
        }
        let snapshot = FolderSnapshot::capture(self.fs.as_ref(), &self.folder)?;

        let mut events = Vec::new();
        for entry in snapshot.entries() {
            match self.known.get(&entry.path) {
                None => events.push(FileEvent::created(&entry.path)),
                Some(previous) if *previous != entry.modified => {
                    events.push(FileEvent::modified(&entry.path))
                }
                Some(_) => {}
            }
        }

        let current = snapshot.to_index();
        let mut removed: Vec<&PathBuf> = self
            .known
            .keys()
            .filter(|path| !current.contains_key(*path))
            .collect();
        removed.sort();
        events.extend(removed.into_iter().map(FileEvent::deleted));

        self.known = current;

        if events.is_empty() {
            Ok(Poll::Timeout)
        } else {
            debug!(folder = ?self.folder, changes = events.len(), "polling diff");
            Ok(Poll::Events(events))
        }
    }
}

impl ChangeSource for PollingSource {
    fn folder(&self) -> &Path {
        &self.folder
    }

    fn poll(
        &mut self,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<Poll>> + Send + '_>> {
        Box::pin(async move {
            tokio::time::sleep(timeout).await;
            self.scan()
        })
    }

    fn rearm(&mut self) -> Result<()> {
        if self.fs.is_dir(&self.folder) {
            Ok(())
        } else {
            Err(HotFolderError::SubscriptionInvalidated(self.folder.clone()))
        }
    }
}
