// src/engine/core.rs

//! Pure lifecycle state machine for one instance.
//!
//! This module contains a synchronous, deterministic core that consumes
//! [`LifecycleEvent`]s and produces:
//! - an updated [`Phase`]
//! - a list of [`LifecycleCommand`](crate::engine::LifecycleCommand)s describing what the IO shell should do
//!
//! The async shell (`engine::runtime::InstanceRuntime`) is responsible for
//! launching and stopping the worker, attaching and closing watchers and
//! talking to the registry.
//!
//! The core is unit tested without any Tokio, channels, filesystem or
//! processes.

use std::fmt;
use std::path::PathBuf;

use crate::config::DependencyPaths;
use crate::engine::event_handlers::{
    LifecycleEvent, LifecycleStep, handle_build_completed,
    handle_content_changed, handle_dependency_missing, handle_identity_changed,
    handle_shutdown_requested, handle_worker_exited,
};

/// Why an instance left the `Running` phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// A watched dependency was renamed or deleted.
    DependencyMoved(PathBuf),
    /// The required manifest could not be read.
    DependencyMissing(PathBuf),
    /// Interrupt signal or explicit shutdown call.
    Requested,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::DependencyMoved(path) => write!(f, "dependency {path:?} moved"),
            ExitReason::DependencyMissing(path) => write!(f, "dependency {path:?} missing"),
            ExitReason::Requested => f.write_str("shutdown requested"),
        }
    }
}

/// Lifecycle phase of an instance.
///
/// `Exiting` is terminal: every transition function returns an empty step
/// once it has been reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// No worker, no watchers. Waiting for the first build pass.
    Idle,
    /// Worker launched, dependency files watched.
    Running { restarts: u32 },
    /// Watchers closed, worker stopped or stopping.
    Exiting { reason: ExitReason },
}

/// Fieldless mirror of [`Phase`] for status reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Idle,
    Running,
    Exiting,
}

impl Phase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            Phase::Idle => PhaseKind::Idle,
            Phase::Running { .. } => PhaseKind::Running,
            Phase::Exiting { .. } => PhaseKind::Exiting,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Exiting { .. })
    }
}

/// Pure core state for one instance.
///
/// It owns the current phase and the dependency paths it asks the shell to
/// watch. It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug, Clone)]
pub struct LifecycleCore {
    phase: Phase,
    dependencies: DependencyPaths,
}

impl LifecycleCore {
    pub fn new(dependencies: DependencyPaths) -> Self {
        Self {
            phase: Phase::Idle,
            dependencies,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Worker restarts caused by content changes so far.
    pub fn restarts(&self) -> u32 {
        match self.phase {
            Phase::Running { restarts } => restarts,
            _ => 0,
        }
    }

    pub fn dependencies(&self) -> &DependencyPaths {
        &self.dependencies
    }

    /// Handle a single lifecycle event, updating the phase and returning the
    /// commands for the IO shell.
    pub fn step(&mut self, event: LifecycleEvent) -> LifecycleStep {
        match event {
            LifecycleEvent::BuildCompleted => {
                handle_build_completed(&mut self.phase, &self.dependencies)
            }
            LifecycleEvent::ContentChanged { path } => {
                handle_content_changed(&mut self.phase, path)
            }
            LifecycleEvent::IdentityChanged { path } => {
                handle_identity_changed(&mut self.phase, path)
            }
            LifecycleEvent::DependencyMissing { path } => {
                handle_dependency_missing(&mut self.phase, path)
            }
            LifecycleEvent::WorkerExited { generation } => {
                handle_worker_exited(&mut self.phase, generation)
            }
            LifecycleEvent::ShutdownRequested => handle_shutdown_requested(&mut self.phase),
        }
    }
}
