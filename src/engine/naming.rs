// src/engine/naming.rs

//! Diagnostic names for units of work.
//!
//! Work runs as tasks on a shared runtime, so OS thread names say nothing
//! about what a thread is doing at the moment. Instead each unit of work runs
//! inside a `work` span carrying its name; the span is entered whenever the
//! future is polled and dropped when it completes, so the name is scoped to
//! exactly that piece of work.

use std::fmt;
use std::future::Future;

use tracing::instrument::Instrumented;
use tracing::{info_span, Instrument};

/// Run `fut` under the diagnostic name `name`.
pub fn named<F>(name: impl fmt::Display, fut: F) -> Instrumented<F>
where
    F: Future,
{
    fut.instrument(info_span!("work", name = %name))
}

/// Name for the task handling one file of a batch.
pub fn worker_name(watcher: &str, seq: usize, file: &str) -> String {
    format!("{watcher}-worker-{seq}:{file}")
}
