// src/exec/mod.rs

//! Worker process execution layer.
//!
//! This module is responsible for actually running the worker, using
//! `tokio::process::Command`, and reporting unexpected exits back to the
//! instance runtime via `InstanceEvent`s.
//!
//! - [`backend`] provides the `WorkerLauncher` / `WorkerProcess` traits and
//!   the concrete `ProcessLauncher` used in production, which tests can
//!   replace with a fake implementation.
//! - [`supervisor`] owns the single worker of one instance and enforces
//!   stop-before-start.

pub mod backend;
pub mod supervisor;

pub use backend::{ProcessLauncher, WorkerExit, WorkerFuture, WorkerLauncher, WorkerProcess};
pub use supervisor::WorkerSupervisor;
