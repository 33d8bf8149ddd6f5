// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

#[derive(Debug, Default)]
struct MockState {
    files: BTreeMap<PathBuf, SystemTime>,
    dirs: BTreeSet<PathBuf>,
    /// Seconds since the epoch handed out by `add_file` / `touch`.
    clock: u64,
}

impl MockState {
    fn tick(&mut self) -> SystemTime {
        self.clock += 1;
        SystemTime::UNIX_EPOCH + Duration::from_secs(self.clock)
    }

    fn ensure_dir(&mut self, path: &Path) {
        let mut current = Some(path);
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(dir.to_path_buf());
            current = dir.parent();
        }
    }
}

/// In-memory filesystem with explicit modification times.
///
/// Every `add_file` / `touch` advances a logical clock by one second, so
/// listing order is deterministic without sleeping between writes.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut state = self.state.lock().unwrap();
        state.ensure_dir(path.as_ref());
    }

    /// Add (or overwrite) a file stamped with the next logical tick.
    pub fn add_file(&self, path: impl AsRef<Path>) -> SystemTime {
        let mut state = self.state.lock().unwrap();
        let stamp = state.tick();
        Self::insert_file(&mut state, path.as_ref(), stamp);
        stamp
    }

    /// Add (or overwrite) a file with an explicit modification time.
    pub fn add_file_at(&self, path: impl AsRef<Path>, modified: SystemTime) {
        let mut state = self.state.lock().unwrap();
        Self::insert_file(&mut state, path.as_ref(), modified);
    }

    /// Bump the modification time of an existing file.
    pub fn touch(&self, path: impl AsRef<Path>) -> Result<SystemTime> {
        let mut state = self.state.lock().unwrap();
        let path = path.as_ref();
        if !state.files.contains_key(path) {
            return Err(anyhow!("File not found: {:?}", path));
        }
        let stamp = state.tick();
        state.files.insert(path.to_path_buf(), stamp);
        Ok(stamp)
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        let mut state = self.state.lock().unwrap();
        let path = path.as_ref();
        state.files.remove(path);
        state.dirs.remove(path);
    }

    fn insert_file(state: &mut MockState, path: &Path, modified: SystemTime) {
        if let Some(parent) = path.parent() {
            state.ensure_dir(parent);
        }
        state.files.insert(path.to_path_buf(), modified);
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        state.files.contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        state.dirs.contains(path)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        // In mock, we just return the path as is, assuming absolute paths are used in tests
        Ok(path.to_path_buf())
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let state = self.state.lock().unwrap();
        if !state.dirs.contains(path) {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }
        let children = state
            .files
            .keys()
            .chain(state.dirs.iter())
            .filter(|p| p.parent() == Some(path))
            .cloned()
            .collect();
        Ok(children)
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
        let state = self.state.lock().unwrap();
        state
            .files
            .get(path)
            .copied()
            .ok_or_else(|| anyhow!("File not found: {:?}", path))
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let modified = state
            .files
            .remove(from)
            .ok_or_else(|| anyhow!("File not found: {:?}", from))?;
        if let Some(parent) = to.parent() {
            if !state.dirs.contains(parent) {
                state.files.insert(from.to_path_buf(), modified);
                return Err(anyhow!("Target directory missing: {:?}", parent));
            }
        }
        state.files.insert(to.to_path_buf(), modified);
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.ensure_dir(path);
        Ok(())
    }
}
