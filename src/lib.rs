// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{DualFolderScanner, StopSignal};
use crate::exec::CommandClient;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - the command client
/// - the dual folder scanner
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?.with_overrides(
        args.concurrency.map(|c| c as usize),
        args.poll_interval_ms,
        args.detector,
    )?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let scan_settings = cfg.scan_settings()?;
    let client = Arc::new(CommandClient::new(cfg.command_settings()));
    let stop = StopSignal::new();

    // Ctrl-C → same path as the stop file.
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            if stop.set() {
                info!("Ctrl-C received; stopping");
            }
        });
    }

    let scanner = DualFolderScanner::new(scan_settings, client, stop);
    scanner.run().await?;
    Ok(())
}

/// Simple dry-run output: print the resolved folders and settings.
fn print_dry_run(cfg: &ConfigFile) {
    let folders = cfg.folders();
    let scan = cfg.scan();
    let handler = cfg.handler();

    println!("hotfolder dry-run");
    println!("  folders.watch     = {}", folders.watch.display());
    println!("  folders.stop      = {}", folders.stop.display());
    println!("  folders.processed = {}", folders.processed.display());
    println!("  folders.failed    = {}", folders.failed.display());
    println!();

    println!("scan:");
    println!("  poll_interval_ms = {}", scan.poll_interval_ms);
    println!("  concurrency = {}", scan.concurrency);
    println!("  grace_period_ms = {}", scan.grace_period_ms);
    println!("  detector = {:?}", scan.detector);
    println!("  stop_file = {}", scan.stop_file);
    if !scan.include.is_empty() {
        println!("  include: {:?}", scan.include);
    }
    if !scan.exclude.is_empty() {
        println!("  exclude: {:?}", scan.exclude);
    }
    println!();

    println!("handler:");
    println!("  cmd: {}", handler.cmd);
    if let Some(ms) = handler.timeout_ms {
        println!("  timeout_ms: {ms}");
    }
    if !handler.process_modified {
        println!("  process_modified: false");
    }

    debug!("dry-run complete (no watching)");
}
