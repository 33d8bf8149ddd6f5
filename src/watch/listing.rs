// src/watch/listing.rs

//! Directory listing sorted by modification time.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use tracing::debug;

use crate::fs::FileSystem;

/// One regular file in a [`FolderSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// The regular files directly inside a folder, oldest first.
///
/// Ties on modification time are broken by path so the order is fully
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderSnapshot {
    entries: Vec<SnapshotEntry>,
}

impl FolderSnapshot {
    /// List `dir` (non-recursively) and sort by ascending modification time.
    ///
    /// Subdirectories are skipped. A file that disappears between listing and
    /// reading its metadata is skipped as well: it was moved away while we
    /// looked and its removal will be reported separately.
    pub fn capture(fs: &dyn FileSystem, dir: &Path) -> Result<Self> {
        let children = fs
            .read_dir(dir)
            .with_context(|| format!("listing folder {:?}", dir))?;

        let mut entries = Vec::with_capacity(children.len());
        for path in children {
            if !fs.is_file(&path) {
                continue;
            }
            match fs.modified(&path) {
                Ok(modified) => entries.push(SnapshotEntry { path, modified }),
                Err(err) => {
                    debug!(?path, error = %err, "file vanished while listing; skipping");
                }
            }
        }

        entries.sort_by(|a, b| {
            a.modified
                .cmp(&b.modified)
                .then_with(|| a.path.cmp(&b.path))
        });

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|e| e.path.as_path())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Path -> modification time, for diffing against a later snapshot.
    pub fn to_index(&self) -> HashMap<PathBuf, SystemTime> {
        self.entries
            .iter()
            .map(|e| (e.path.clone(), e.modified))
            .collect()
    }
}
