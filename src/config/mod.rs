// src/config/mod.rs

//! Configuration loading and validation for hotfolder.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk and resolve its folders (`loader.rs`).
//! - Validate folder layout and scan parameters (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{config_root_dir, default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, FoldersSection, HandlerSection, RawConfigFile, ScanSection};
