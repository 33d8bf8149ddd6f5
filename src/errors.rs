// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

use crate::watch::FileAction;

#[derive(Error, Debug)]
pub enum HotFolderError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Folder does not exist or is not a directory: {0:?}")]
    FolderNotFound(PathBuf),

    #[error("Failed to watch folder {path:?}: {error}")]
    WatchFailed { path: PathBuf, error: notify::Error },

    #[error("Watch subscription for {0:?} was invalidated")]
    SubscriptionInvalidated(PathBuf),

    #[error("Callback {action} failed for {path:?}: {error:#}")]
    CallbackFailed {
        action: FileAction,
        path: PathBuf,
        error: anyhow::Error,
    },

    #[error("Worker for {label} ended abnormally: {message}")]
    WorkerAborted { label: String, message: String },

    /// Cooperative cancellation. Observing this is a clean shutdown.
    #[error("Scan stopped")]
    Stopped,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HotFolderError {
    /// True for the cancellation condition rather than a real failure.
    pub fn is_stop(&self) -> bool {
        matches!(self, HotFolderError::Stopped)
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, HotFolderError>;
