// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation or path resolution. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Resolves relative folders against the config file's directory.
/// - Checks for:
///   - empty or duplicated folders,
///   - zero concurrency or poll interval,
///   - invalid glob patterns and stop file names.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let mut raw_config = load_from_path(path)?;
    raw_config.resolve_relative_to(&config_root_dir(path));
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Directory that relative folder paths are resolved against.
///
/// - If the config path has a non-empty parent (e.g. "conf/Hotfolder.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Hotfolder.toml" (parent = ""),
///   we fall back to the current working directory "."
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Default config path: `Hotfolder.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Hotfolder.toml")
}
