// src/engine/event_handlers.rs

//! Transition functions for the lifecycle core.
//!
//! Each handler takes the current phase by `&mut`, moves it forward when the
//! event is legal in that phase and returns the commands the shell must run.
//! Events that are not legal in the current phase (a restart request while
//! exiting, a build pass while already running, ...) return an empty step and
//! leave the phase untouched.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::config::DependencyPaths;
use crate::engine::core::{ExitReason, Phase};
use crate::types::DependencyRole;

/// Inputs to the lifecycle core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The host build tool finished a build pass.
    BuildCompleted,
    /// A watched file's bytes differ from its last snapshot.
    ContentChanged { path: PathBuf },
    /// A watched path was renamed or removed.
    IdentityChanged { path: PathBuf },
    /// Attaching the watcher on the required manifest failed.
    DependencyMissing { path: PathBuf },
    /// The current worker exited on its own.
    WorkerExited { generation: u64 },
    /// Interrupt signal or explicit shutdown call.
    ShutdownRequested,
}

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleCommand {
    /// Stop the current worker (if any), then launch a new one.
    StartWorker,
    /// Read `path` and subscribe to its changes, replacing any prior
    /// subscription on the same path.
    WatchDependency { role: DependencyRole, path: PathBuf },
    /// Close every watcher of this instance.
    CloseWatchers,
    /// Stop the worker and wait for it to exit.
    StopWorker,
    /// Collect an exited worker and drop it from the registry.
    ReapWorker { generation: u64 },
    /// Terminate the host process if no instance has a running worker.
    RequestHostExit { reason: ExitReason },
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleStep {
    /// Commands for the IO shell, in order.
    pub commands: Vec<LifecycleCommand>,
    /// Whether the instance keeps accepting events.
    pub keep_running: bool,
}

impl LifecycleStep {
    fn none(phase: &Phase) -> Self {
        Self {
            commands: Vec::new(),
            keep_running: !phase.is_terminal(),
        }
    }

    fn with(phase: &Phase, commands: Vec<LifecycleCommand>) -> Self {
        Self {
            commands,
            keep_running: !phase.is_terminal(),
        }
    }
}

/// idle → running: launch the worker and watch both dependency files.
///
/// A build pass while already running is a no-op; the worker is not
/// restarted merely because another build completed.
pub fn handle_build_completed(phase: &mut Phase, deps: &DependencyPaths) -> LifecycleStep {
    match phase {
        Phase::Idle => {
            *phase = Phase::Running { restarts: 0 };
            info!("build pass completed; starting worker");
            LifecycleStep::with(
                phase,
                vec![
                    LifecycleCommand::StartWorker,
                    LifecycleCommand::WatchDependency {
                        role: DependencyRole::Manifest,
                        path: deps.manifest.clone(),
                    },
                    LifecycleCommand::WatchDependency {
                        role: DependencyRole::Config,
                        path: deps.config.clone(),
                    },
                ],
            )
        }
        Phase::Running { .. } => {
            debug!("build pass completed while running; nothing to do");
            LifecycleStep::none(phase)
        }
        Phase::Exiting { .. } => LifecycleStep::none(phase),
    }
}

/// running → running: restart the worker. Watchers stay attached.
pub fn handle_content_changed(phase: &mut Phase, path: PathBuf) -> LifecycleStep {
    match phase {
        Phase::Running { restarts } => {
            *restarts += 1;
            info!(path = ?path, restarts = *restarts, "dependency content changed; restarting worker");
            LifecycleStep::with(phase, vec![LifecycleCommand::StartWorker])
        }
        Phase::Idle | Phase::Exiting { .. } => {
            debug!(path = ?path, "ignoring content change outside the running phase");
            LifecycleStep::none(phase)
        }
    }
}

/// running → exiting: the watch target itself is gone, so the instance shuts
/// down completely instead of re-resolving the path.
pub fn handle_identity_changed(phase: &mut Phase, path: PathBuf) -> LifecycleStep {
    match phase {
        Phase::Running { .. } => {
            warn!(
                path = ?path,
                "dependency file path changed, restart of the host required"
            );
            begin_exit(phase, ExitReason::DependencyMoved(path), true)
        }
        Phase::Idle | Phase::Exiting { .. } => LifecycleStep::none(phase),
    }
}

/// running → exiting without asking the host to terminate: the instance
/// failed, its siblings carry on.
pub fn handle_dependency_missing(phase: &mut Phase, path: PathBuf) -> LifecycleStep {
    match phase {
        Phase::Running { .. } => begin_exit(phase, ExitReason::DependencyMissing(path), false),
        Phase::Idle | Phase::Exiting { .. } => LifecycleStep::none(phase),
    }
}

/// {idle, running} → exiting.
pub fn handle_shutdown_requested(phase: &mut Phase) -> LifecycleStep {
    match phase {
        Phase::Idle | Phase::Running { .. } => begin_exit(phase, ExitReason::Requested, true),
        Phase::Exiting { .. } => LifecycleStep::none(phase),
    }
}

/// The worker died on its own. The instance stays running with its watchers
/// attached; the next content change launches a fresh worker.
pub fn handle_worker_exited(phase: &mut Phase, generation: u64) -> LifecycleStep {
    match phase {
        Phase::Running { .. } => {
            LifecycleStep::with(phase, vec![LifecycleCommand::ReapWorker { generation }])
        }
        Phase::Idle | Phase::Exiting { .. } => LifecycleStep::none(phase),
    }
}

fn begin_exit(phase: &mut Phase, reason: ExitReason, request_host_exit: bool) -> LifecycleStep {
    info!(reason = %reason, "instance exiting");

    let mut commands = vec![LifecycleCommand::CloseWatchers, LifecycleCommand::StopWorker];
    if request_host_exit {
        commands.push(LifecycleCommand::RequestHostExit {
            reason: reason.clone(),
        });
    }

    *phase = Phase::Exiting { reason };
    LifecycleStep::with(phase, commands)
}
