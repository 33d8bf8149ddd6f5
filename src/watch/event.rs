// src/watch/event.rs

//! Event and batch types shared by the change sources, the detector and the
//! dispatcher.

use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

/// Kind of a raw filesystem change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    Created,
    Modified,
    Deleted,
    /// The native watch queue dropped events; the folder must be re-synced.
    Overflow,
}

/// A single change notification, either from a change source or synthesized
/// during a folder sync.
///
/// `path` may be relative to the watched folder; the detector resolves it.
/// For `Overflow` the path is meaningless and usually empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub path: PathBuf,
    pub kind: FileEventKind,
}

impl FileEvent {
    pub fn new(path: impl Into<PathBuf>, kind: FileEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self::new(path, FileEventKind::Created)
    }

    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self::new(path, FileEventKind::Modified)
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self::new(path, FileEventKind::Deleted)
    }

    pub fn overflow() -> Self {
        Self::new(PathBuf::new(), FileEventKind::Overflow)
    }

    /// The pending action this event asks for, `None` for overflow.
    pub fn action(&self) -> Option<FileAction> {
        match self.kind {
            FileEventKind::Created => Some(FileAction::Added),
            FileEventKind::Modified => Some(FileAction::Modified),
            FileEventKind::Deleted => Some(FileAction::Deleted),
            FileEventKind::Overflow => None,
        }
    }
}

/// What the client is asked to do with a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileAction {
    Added,
    Modified,
    Deleted,
}

impl FileAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileAction::Added => "file_added",
            FileAction::Modified => "file_modified",
            FileAction::Deleted => "file_deleted",
        }
    }
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deduplicated set of pending actions collected from one poll cycle or one
/// full folder sync.
///
/// Keyed by absolute path in first-insertion order. Inserting a path that is
/// already present replaces its action but keeps its position: the state of
/// the file at dispatch time reflects only the latest change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    entries: IndexMap<PathBuf, FileAction>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `action` for `path`, returning the action it replaced.
    pub fn insert(&mut self, path: impl Into<PathBuf>, action: FileAction) -> Option<FileAction> {
        self.entries.insert(path.into(), action)
    }

    pub fn get(&self, path: &Path) -> Option<FileAction> {
        self.entries.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, FileAction)> {
        self.entries.iter().map(|(p, a)| (p.as_path(), *a))
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.keys().map(PathBuf::as_path)
    }
}

impl IntoIterator for Batch {
    type Item = (PathBuf, FileAction);
    type IntoIter = indexmap::map::IntoIter<PathBuf, FileAction>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(PathBuf, FileAction)> for Batch {
    fn from_iter<I: IntoIterator<Item = (PathBuf, FileAction)>>(iter: I) -> Self {
        let mut batch = Batch::new();
        for (path, action) in iter {
            batch.insert(path, action);
        }
        batch
    }
}
