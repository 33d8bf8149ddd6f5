// src/config/model.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::engine::{ScanSettings, WatcherSettings, STOP_FILE_NAME};
use crate::errors::{HotFolderError, Result};
use crate::exec::CommandSettings;
use crate::types::DetectorMode;
use crate::watch::FileFilter;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [folders]
/// watch = "inbox"
/// stop = "control"
/// processed = "done"
/// failed = "failed"
///
/// [scan]
/// poll_interval_ms = 1000
/// concurrency = 4
/// include = ["*.xml"]
///
/// [handler]
/// cmd = "ingest --file {file}"
/// timeout_ms = 60000
/// ```
///
/// Relative folder paths are resolved against the directory holding the
/// config file.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    pub folders: FoldersSection,

    #[serde(default)]
    pub scan: ScanSection,

    pub handler: HandlerSection,
}

/// `[folders]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct FoldersSection {
    /// The hot folder.
    pub watch: PathBuf,
    /// Folder observed for the stop file.
    pub stop: PathBuf,
    /// Destination for successfully processed files.
    pub processed: PathBuf,
    /// Destination for files whose processing failed.
    pub failed: PathBuf,
}

/// `[scan]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanSection {
    /// Upper bound on every blocking wait, and therefore on how long a stop
    /// request takes to be noticed.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum number of files processed at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// How long running callbacks get to finish once a batch is aborted.
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// `"native"` (default) or `"polling"`.
    #[serde(default)]
    pub detector: DetectorMode,

    /// File name globs to process; empty means all files.
    #[serde(default)]
    pub include: Vec<String>,

    /// File name globs to ignore.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Name of the sentinel file in the stop folder.
    #[serde(default = "default_stop_file")]
    pub stop_file: String,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_concurrency() -> usize {
    1
}

fn default_grace_period_ms() -> u64 {
    5000
}

fn default_stop_file() -> String {
    STOP_FILE_NAME.to_string()
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            concurrency: default_concurrency(),
            grace_period_ms: default_grace_period_ms(),
            detector: DetectorMode::default(),
            include: Vec::new(),
            exclude: Vec::new(),
            stop_file: default_stop_file(),
        }
    }
}

/// `[handler]` section: the command run for each file.
#[derive(Debug, Clone, Deserialize)]
pub struct HandlerSection {
    /// Shell command; `{file}` is replaced by the quoted file path.
    pub cmd: String,

    /// Kill the command after this many milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Whether the command is told about modifications as `file_modified`;
    /// otherwise they are reported as `file_added`.
    #[serde(default = "default_process_modified")]
    pub process_modified: bool,
}

fn default_process_modified() -> bool {
    true
}

impl RawConfigFile {
    /// Make every relative folder path relative to `base` instead of the
    /// current working directory.
    pub fn resolve_relative_to(&mut self, base: &Path) {
        for path in [
            &mut self.folders.watch,
            &mut self.folders.stop,
            &mut self.folders.processed,
            &mut self.folders.failed,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)` or
/// [`load_and_validate`](crate::config::load_and_validate).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    folders: FoldersSection,
    scan: ScanSection,
    handler: HandlerSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        folders: FoldersSection,
        scan: ScanSection,
        handler: HandlerSection,
    ) -> Self {
        Self {
            folders,
            scan,
            handler,
        }
    }

    pub fn folders(&self) -> &FoldersSection {
        &self.folders
    }

    pub fn scan(&self) -> &ScanSection {
        &self.scan
    }

    pub fn handler(&self) -> &HandlerSection {
        &self.handler
    }

    /// Override `[scan]` values (from the command line).
    pub fn with_overrides(
        mut self,
        concurrency: Option<usize>,
        poll_interval_ms: Option<u64>,
        detector: Option<DetectorMode>,
    ) -> Result<Self> {
        if let Some(c) = concurrency {
            self.scan.concurrency = c;
        }
        if let Some(p) = poll_interval_ms {
            self.scan.poll_interval_ms = p;
        }
        if let Some(d) = detector {
            self.scan.detector = d;
        }
        crate::config::validate::validate_scan(&self.scan)?;
        Ok(self)
    }

    /// Settings for the scan session.
    pub fn scan_settings(&self) -> Result<ScanSettings> {
        let filter = FileFilter::new(&self.scan.include, &self.scan.exclude)
            .map_err(|e| HotFolderError::ConfigError(format!("[scan] patterns: {e:#}")))?;

        let watch = WatcherSettings::new(self.folders.watch.clone())
            .with_poll_interval(Duration::from_millis(self.scan.poll_interval_ms))
            .with_concurrency(self.scan.concurrency)
            .with_grace_period(Duration::from_millis(self.scan.grace_period_ms))
            .with_detector(self.scan.detector)
            .with_filter(filter);

        Ok(ScanSettings {
            watch,
            stop_folder: self.folders.stop.clone(),
            stop_file: self.scan.stop_file.clone(),
        })
    }

    /// Settings for the command client.
    pub fn command_settings(&self) -> CommandSettings {
        CommandSettings {
            cmd: self.handler.cmd.clone(),
            timeout: self.handler.timeout_ms.map(Duration::from_millis),
            processed_folder: self.folders.processed.clone(),
            failed_folder: self.folders.failed.clone(),
            process_modified: self.handler.process_modified,
        }
    }
}
