// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Listing a folder oldest-first (`listing`).
//! - Receiving change notifications, either from the platform watch API
//!   (`native`) or by diffing periodic listings (`polling`), behind the
//!   [`ChangeSource`] trait.
//! - Turning those notifications into deduplicated [`Batch`]es, including
//!   overflow detection and glob filtering (`detector`, `filter`).
//!
//! It does **not** know about worker pools or clients; it only turns
//! filesystem changes into per-file actions.

pub mod detector;
pub mod event;
pub mod filter;
pub mod listing;
pub mod native;
pub mod path_utils;
pub mod polling;
pub mod source;

pub use detector::{ChangeDetector, Detection};
pub use event::{Batch, FileAction, FileEvent, FileEventKind};
pub use filter::FileFilter;
pub use listing::{FolderSnapshot, SnapshotEntry};
pub use native::{translate_event, NativeSource};
pub use polling::PollingSource;
pub use source::{open_source, ChangeSource, Poll};
