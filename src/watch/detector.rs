// src/watch/detector.rs

//! Turns raw change notifications into deduplicated batches.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::engine::StopSignal;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::watch::event::{Batch, FileAction, FileEvent, FileEventKind};
use crate::watch::filter::FileFilter;
use crate::watch::listing::FolderSnapshot;
use crate::watch::path_utils::{file_name_str, is_direct_child, resolve_in};

/// Result of interpreting one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    /// Coalesced actions ready for dispatch (possibly empty).
    Batch(Batch),
    /// The watch queue overflowed; everything collected so far is discarded
    /// and the folder has to be re-synced.
    Overflow,
}

/// Maps filesystem events for one folder to [`Batch`]es.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    folder: PathBuf,
    fs: Arc<dyn FileSystem>,
    filter: FileFilter,
}

impl ChangeDetector {
    pub fn new(folder: impl Into<PathBuf>, fs: Arc<dyn FileSystem>, filter: FileFilter) -> Self {
        Self {
            folder: folder.into(),
            fs,
            filter,
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Full sync: one `Added` action per file currently in the folder, oldest
    /// modification time first.
    ///
    /// Used at startup and after an overflow.
    pub fn initial_sync(&self) -> Result<Batch> {
        let snapshot = FolderSnapshot::capture(self.fs.as_ref(), &self.folder)?;

        let mut batch = Batch::new();
        for path in snapshot.paths() {
            if self.accepts(path) {
                batch.insert(path, FileAction::Added);
            }
        }

        debug!(
            folder = ?self.folder,
            listed = snapshot.len(),
            accepted = batch.len(),
            "folder sync"
        );
        Ok(batch)
    }

    /// Interpret the events of one poll cycle.
    ///
    /// The stop signal is checked once per event; an overflow anywhere in the
    /// list wins over every event collected before it. Later events for the
    /// same path replace earlier ones.
    pub fn collect<I>(&self, events: I, stop: &StopSignal) -> Result<Detection>
    where
        I: IntoIterator<Item = FileEvent>,
    {
        let mut batch = Batch::new();

        for event in events {
            stop.check()?;

            let Some(action) = event.action() else {
                debug!(folder = ?self.folder, "overflow reported; discarding poll result");
                return Ok(Detection::Overflow);
            };

            let path = resolve_in(&self.folder, &event.path);
            if !self.is_relevant(&path, event.kind) {
                trace!(?path, kind = ?event.kind, "ignoring event");
                continue;
            }

            if let Some(previous) = batch.insert(&path, action) {
                debug!(?path, ?previous, latest = ?action, "coalesced event");
            }
        }

        Ok(Detection::Batch(batch))
    }

    fn is_relevant(&self, path: &Path, kind: FileEventKind) -> bool {
        if path == self.folder || !is_direct_child(&self.folder, path) {
            return false;
        }
        // Deleted paths no longer exist, so they cannot be checked for being
        // a directory; they are always delivered.
        if kind != FileEventKind::Deleted && self.fs.is_dir(path) {
            return false;
        }
        self.accepts(path)
    }

    fn accepts(&self, path: &Path) -> bool {
        file_name_str(path).is_some_and(|name| self.filter.matches(&name))
    }
}
