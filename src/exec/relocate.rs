// src/exec/relocate.rs

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use tracing::debug;

use crate::fs::FileSystem;

/// Move `file` into `target_dir`, creating the folder if needed.
///
/// An existing file of the same name is never overwritten; the moved file
/// gets a numeric suffix instead (`a.xml` -> `a.xml.1`, `a.xml.2`, ...).
/// Returns the final path.
pub fn relocate(fs: &dyn FileSystem, file: &Path, target_dir: &Path) -> Result<PathBuf> {
    let name = file
        .file_name()
        .ok_or_else(|| anyhow!("cannot relocate {:?}: no file name", file))?;

    fs.create_dir_all(target_dir)?;

    let mut target = target_dir.join(name);
    let mut suffix = 0u32;
    while fs.exists(&target) {
        suffix += 1;
        let mut candidate = name.to_os_string();
        candidate.push(format!(".{suffix}"));
        target = target_dir.join(candidate);
    }

    fs.rename(file, &target)?;
    debug!(from = ?file, to = ?target, "relocated file");
    Ok(target)
}
