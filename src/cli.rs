// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::DetectorMode;

/// Command-line arguments for `hotfolder`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "hotfolder",
    version,
    about = "Watch a hot folder and run a command for every file dropped into it.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Hotfolder.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Hotfolder.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `HOTFOLDER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the resolved settings, but don't watch anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Override `[scan].concurrency`.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub concurrency: Option<u32>,

    /// Override `[scan].poll_interval_ms`.
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval_ms: Option<u64>,

    /// Override `[scan].detector` (native or polling).
    #[arg(long, value_name = "MODE")]
    pub detector: Option<DetectorMode>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
