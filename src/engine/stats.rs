// src/engine/stats.rs

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::watch::FileAction;

/// Progress counters for one watcher.
///
/// Incremented by worker tasks, read for logging only; exact values under
/// concurrent updates are not relied on.
#[derive(Debug, Default)]
pub struct RunStatistics {
    added: AtomicU64,
    modified: AtomicU64,
    deleted: AtomicU64,
    batches: AtomicU64,
}

/// Point-in-time copy of [`RunStatistics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub added: u64,
    pub modified: u64,
    pub deleted: u64,
    pub batches: u64,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one successfully handled callback.
    pub fn record(&self, action: FileAction) {
        let counter = match action {
            FileAction::Added => &self.added,
            FileAction::Modified => &self.modified,
            FileAction::Deleted => &self.deleted,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch(&self) {
        self.batches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            added: self.added.load(Ordering::Relaxed),
            modified: self.modified.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    pub fn total(&self) -> u64 {
        self.added + self.modified + self.deleted
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "added={} modified={} deleted={} batches={}",
            self.added, self.modified, self.deleted, self.batches
        )
    }
}
