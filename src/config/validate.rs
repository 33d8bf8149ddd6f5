// src/config/validate.rs

use crate::config::model::{ConfigFile, FoldersSection, HandlerSection, RawConfigFile, ScanSection};
use crate::errors::{HotFolderError, Result};
use crate::watch::FileFilter;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::HotFolderError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.folders, raw.scan, raw.handler))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_folders(&cfg.folders)?;
    validate_scan(&cfg.scan)?;
    validate_handler(&cfg.handler)?;
    Ok(())
}

fn validate_folders(folders: &FoldersSection) -> Result<()> {
    let named = [
        ("watch", &folders.watch),
        ("stop", &folders.stop),
        ("processed", &folders.processed),
        ("failed", &folders.failed),
    ];

    for (name, path) in named.iter() {
        if path.as_os_str().is_empty() {
            return Err(HotFolderError::ConfigError(format!(
                "[folders].{name} must not be empty"
            )));
        }
    }

    // Every folder must be distinct: moving a processed file back into the
    // hot folder would process it again, and a shared stop folder would
    // treat data files as stop requests.
    for (i, (a_name, a)) in named.iter().enumerate() {
        for (b_name, b) in named.iter().skip(i + 1) {
            if a == b {
                return Err(HotFolderError::ConfigError(format!(
                    "[folders].{a_name} and [folders].{b_name} must be different folders (both {:?})",
                    a
                )));
            }
        }
    }

    Ok(())
}

pub(crate) fn validate_scan(scan: &ScanSection) -> Result<()> {
    if scan.concurrency == 0 {
        return Err(HotFolderError::ConfigError(
            "[scan].concurrency must be >= 1 (got 0)".to_string(),
        ));
    }

    if scan.poll_interval_ms == 0 {
        return Err(HotFolderError::ConfigError(
            "[scan].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    let stop_file = scan.stop_file.trim();
    if stop_file.is_empty() || stop_file.contains('/') || stop_file.contains('\\') {
        return Err(HotFolderError::ConfigError(format!(
            "[scan].stop_file must be a plain file name (got {:?})",
            scan.stop_file
        )));
    }

    FileFilter::new(&scan.include, &scan.exclude)
        .map_err(|e| HotFolderError::ConfigError(format!("[scan] patterns: {e:#}")))?;

    Ok(())
}

fn validate_handler(handler: &HandlerSection) -> Result<()> {
    if handler.cmd.trim().is_empty() {
        return Err(HotFolderError::ConfigError(
            "[handler].cmd must not be empty".to_string(),
        ));
    }
    if handler.timeout_ms == Some(0) {
        return Err(HotFolderError::ConfigError(
            "[handler].timeout_ms must be >= 1 when set".to_string(),
        ));
    }
    Ok(())
}
