#![allow(dead_code)]

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use hotfolder::config::{
    ConfigFile, FoldersSection, HandlerSection, RawConfigFile, ScanSection,
};
use hotfolder::errors::Result;
use hotfolder::types::DetectorMode;
use tempfile::TempDir;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    /// Folders `watch`, `stop`, `processed` and `failed` under `root`, with
    /// the handler command `true`.
    pub fn new(root: &Path) -> Self {
        Self {
            config: RawConfigFile {
                folders: FoldersSection {
                    watch: root.join("watch"),
                    stop: root.join("stop"),
                    processed: root.join("processed"),
                    failed: root.join("failed"),
                },
                scan: ScanSection::default(),
                handler: HandlerSection {
                    cmd: "true".to_string(),
                    timeout_ms: None,
                    process_modified: true,
                },
            },
        }
    }

    pub fn with_cmd(mut self, cmd: &str) -> Self {
        self.config.handler.cmd = cmd.to_string();
        self
    }

    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.config.handler.timeout_ms = Some(ms);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.config.scan.concurrency = concurrency;
        self
    }

    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.scan.poll_interval_ms = ms;
        self
    }

    pub fn with_detector(mut self, detector: DetectorMode) -> Self {
        self.config.scan.detector = detector;
        self
    }

    pub fn include(mut self, pattern: &str) -> Self {
        self.config.scan.include.push(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.config.scan.exclude.push(pattern.to_string());
        self
    }

    pub fn with_stop_file(mut self, name: &str) -> Self {
        self.config.scan.stop_file = name.to_string();
        self
    }

    pub fn with_stop_folder(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.folders.stop = path.into();
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

/// Temporary directory laid out like a hot folder installation.
///
/// Files are written to a private staging folder first and then renamed into
/// place, so a native watcher sees exactly one creation per dropped file.
pub struct HotFolderFixture {
    dir: TempDir,
    pub watch: PathBuf,
    pub stop: PathBuf,
    pub processed: PathBuf,
    pub failed: PathBuf,
    staging: PathBuf,
}

impl HotFolderFixture {
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let root = dir.path().to_path_buf();
        let fixture = Self {
            watch: root.join("watch"),
            stop: root.join("stop"),
            processed: root.join("processed"),
            failed: root.join("failed"),
            staging: root.join("staging"),
            dir,
        };
        for folder in [&fixture.watch, &fixture.stop, &fixture.staging] {
            fs::create_dir_all(folder)?;
        }
        Ok(fixture)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn config(&self) -> ConfigFileBuilder {
        ConfigFileBuilder::new(self.root())
    }

    /// Write a file directly into the hot folder (no staging).
    pub fn write_file(&self, name: &str, contents: &str) -> io::Result<PathBuf> {
        let path = self.watch.join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Move a new file into `folder` atomically.
    pub fn drop_into(&self, folder: &Path, name: &str, contents: &str) -> io::Result<PathBuf> {
        let staged = self.staging.join(name);
        fs::write(&staged, contents)?;
        let target = folder.join(name);
        fs::rename(&staged, &target)?;
        Ok(target)
    }

    pub fn drop_file(&self, name: &str, contents: &str) -> io::Result<PathBuf> {
        self.drop_into(&self.watch, name, contents)
    }

    /// Drop the default `stoprunning` sentinel into the stop folder.
    pub fn request_stop(&self) -> io::Result<PathBuf> {
        self.drop_into(&self.stop, hotfolder::engine::STOP_FILE_NAME, "")
    }

    /// Write `Hotfolder.toml` into the fixture root.
    pub fn write_config(&self, body: &str) -> io::Result<PathBuf> {
        let path = self.root().join("Hotfolder.toml");
        fs::write(&path, body)?;
        Ok(path)
    }
}
