// src/watch/mod.rs

//! Dependency file watching and change detection.
//!
//! This module is responsible for:
//! - Wiring up a cross-platform filesystem watcher (`notify`) per dependency
//!   file.
//! - Classifying raw events into content changes and identity changes
//!   (rename / delete).
//! - Comparing content against the last snapshot so that a save which
//!   doesn't change the bytes never restarts anything.
//!
//! It does **not** decide what a change means for the worker; it only turns
//! filesystem events into `InstanceEvent::Dependency` notifications.

pub mod event_handler;
pub mod snapshot;
pub mod watcher;

pub use event_handler::classify;
pub use snapshot::Snapshot;
pub use watcher::{WatchHandle, WatchOptions, WatcherSet};
