// src/engine/mod.rs

//! Orchestration engine for hotfolder.
//!
//! This module ties together:
//! - the client contract the watchers drive ([`client`])
//! - the per-batch worker pool ([`dispatcher`])
//! - the run loop of a single watched folder ([`folder_watcher`])
//! - the supervisor pairing the data folder with the stop folder
//!   ([`scanner`])
//! - the shared stop flag and the sentinel client ([`stop`])
//!
//! Change detection itself lives in [`crate::watch`].

pub mod client;
pub mod dispatcher;
pub mod folder_watcher;
pub mod naming;
pub mod scanner;
pub mod stats;
pub mod stop;

pub use client::{ClientFuture, FileProcessingClient};
pub use dispatcher::{BatchDispatcher, DispatchSettings};
pub use folder_watcher::{FolderWatcher, WatcherSettings, WatcherState};
pub use scanner::{DualFolderScanner, ScanSettings};
pub use stats::{RunStatistics, StatsSnapshot};
pub use stop::{StopFolderClient, StopSignal, STOP_FILE_NAME};
