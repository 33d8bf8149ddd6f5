// src/exec/mod.rs

//! Process execution layer.
//!
//! The default processing client shipped with the binary: it runs a
//! configured command for every file that arrives in the hot folder, using
//! `tokio::process::Command`, and moves the file to a processed or failed
//! folder afterwards.
//!
//! - [`command`] runs a single command invocation.
//! - [`relocate`] moves files without overwriting.
//! - [`client`] implements [`FileProcessingClient`](crate::engine::FileProcessingClient)
//!   on top of both.

pub mod client;
pub mod command;
pub mod relocate;

pub use client::{CommandClient, CommandSettings};
pub use command::{run_for_file, CommandOutcome};
pub use relocate::relocate;
