// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::{Path, PathBuf};

/// Resolve an event path against the watched folder.
///
/// Relative paths are joined onto `folder`; absolute paths are returned as-is.
pub fn resolve_in(folder: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        folder.join(path)
    } else {
        path.to_path_buf()
    }
}

/// True if `path` names an entry directly inside `folder`.
///
/// Tries a direct comparison of the parent first. If that fails (e.g. due to
/// symlinks or different absolute prefixes for the same directory, as with
/// `/private/var` on macOS) the parent and folder are canonicalized and
/// compared again. A removed file cannot be canonicalized, which is why only
/// its parent is.
pub fn is_direct_child(folder: &Path, path: &Path) -> bool {
    let Some(parent) = path.parent() else {
        return false;
    };
    if parent == folder {
        return true;
    }

    if let (Ok(folder_canon), Ok(parent_canon)) =
        (folder.canonicalize(), parent.canonicalize())
    {
        return folder_canon == parent_canon;
    }

    false
}

/// File name as a lossy UTF-8 string, for pattern matching and logs.
pub fn file_name_str(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}
