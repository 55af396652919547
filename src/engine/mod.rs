// src/engine/mod.rs

//! Lifecycle engine for relaunch.
//!
//! This module ties together, per instance:
//! - the worker supervisor (start / stop of the external process)
//! - the dependency watchers (manifest + config)
//! - the process-wide instance registry that gates host termination
//!
//! The pure lifecycle state machine lives in [`core`] with its transition
//! functions in [`event_handlers`]; the async/IO shell that executes the
//! resulting commands is [`runtime`]. [`host`] owns every instance of one
//! host process together with the shared registry and the exit channel.

use std::path::PathBuf;

use tokio::sync::oneshot;

use crate::errors::Result;
use crate::exec::WorkerExit;
use crate::types::{ChangeKind, InstanceName};

/// Completion signal handed back to whoever requested a transition.
pub type Reply<T> = oneshot::Sender<Result<T>>;

/// A change reported by one dependency watcher.
///
/// `watch_id` identifies the subscription that produced it; changes from a
/// subscription that has since been closed or replaced are discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyChange {
    pub path: PathBuf,
    pub watch_id: u64,
    pub kind: ChangeKind,
}

/// Events flowing into one instance's runtime from the build hook, its
/// watchers, its worker monitor and the host.
#[derive(Debug)]
pub enum InstanceEvent {
    /// The host build tool finished a successful build pass.
    BuildCompleted { reply: Option<Reply<()>> },
    /// A watched dependency file changed.
    Dependency(DependencyChange),
    /// The worker of the given generation exited without being asked to.
    WorkerExited { generation: u64, exit: WorkerExit },
    /// Shut this instance down (interrupt, or an explicit request).
    ShutdownRequested { reply: Option<Reply<()>> },
    /// Report the current status.
    Inspect { reply: oneshot::Sender<InstanceStatus> },
}

/// Point-in-time view of an instance, for logs and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceStatus {
    pub name: InstanceName,
    pub phase: PhaseKind,
    pub worker_pid: Option<u32>,
    pub worker_running: bool,
    pub watched: Vec<PathBuf>,
    pub restarts: u32,
}

/// Why the host process was asked to terminate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostExit {
    /// The instance whose exit left the registry empty.
    pub last_instance: InstanceName,
    pub reason: ExitReason,
}

pub mod core;
pub mod event_handlers;
pub mod host;
pub mod registry;
pub mod runtime;

pub use self::core::{ExitReason, LifecycleCore, Phase, PhaseKind};
pub use event_handlers::{LifecycleCommand, LifecycleEvent, LifecycleStep};
pub use host::Host;
pub use registry::InstanceRegistry;
pub use runtime::{InstanceHandle, InstanceRuntime, spawn_instance};
