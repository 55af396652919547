// src/engine/runtime.rs

use std::collections::VecDeque;
use std::fmt;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::config::InstanceSpec;
use crate::errors::{RelaunchError, Result};
use crate::exec::{WorkerLauncher, WorkerSupervisor};
use crate::types::{ChangeKind, InstanceName};
use crate::watch::{WatchOptions, WatcherSet};

use super::core::{ExitReason, LifecycleCore};
use super::event_handlers::{LifecycleCommand, LifecycleEvent};
use super::registry::InstanceRegistry;
use super::{HostExit, InstanceEvent, InstanceStatus, Reply};

/// Drives one instance: feeds [`InstanceEvent`]s into its [`LifecycleCore`]
/// and executes the commands that come back.
///
/// This is a pure IO shell around the core. It is the only actor touching
/// the instance's supervisor and watchers, so every transition (including the
/// stop-then-start of a restart) runs to completion before the next event is
/// looked at.
pub struct InstanceRuntime<L: WorkerLauncher> {
    name: InstanceName,
    core: LifecycleCore,
    supervisor: WorkerSupervisor<L>,
    watchers: WatcherSet,
    registry: InstanceRegistry,
    host_exit: mpsc::UnboundedSender<HostExit>,
    event_rx: mpsc::UnboundedReceiver<InstanceEvent>,
}

impl<L: WorkerLauncher> fmt::Debug for InstanceRuntime<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceRuntime")
            .field("name", &self.name)
            .field("core", &self.core)
            .field("watchers", &self.watchers)
            .finish_non_exhaustive()
    }
}

/// Create the runtime for `spec` and spawn it onto the current Tokio runtime.
///
/// The instance starts idle; nothing is launched or watched until
/// [`InstanceHandle::build_completed`] is called.
pub fn spawn_instance<L: WorkerLauncher>(
    spec: &InstanceSpec,
    launcher: L,
    registry: InstanceRegistry,
    host_exit: mpsc::UnboundedSender<HostExit>,
    options: WatchOptions,
) -> InstanceHandle {
    let (tx, rx) = mpsc::unbounded_channel::<InstanceEvent>();

    let supervisor = WorkerSupervisor::new(
        spec.name.clone(),
        spec.args.clone(),
        launcher,
        registry.clone(),
        tx.clone(),
    );
    let watchers = WatcherSet::new(spec.name.clone(), options, tx.clone());

    let runtime = InstanceRuntime {
        name: spec.name.clone(),
        core: LifecycleCore::new(spec.dependencies.clone()),
        supervisor,
        watchers,
        registry,
        host_exit,
        event_rx: rx,
    };

    tokio::spawn(runtime.run());

    InstanceHandle {
        name: spec.name.clone(),
        tx,
    }
}

impl<L: WorkerLauncher> InstanceRuntime<L> {
    /// Main event loop. Returns once the instance reached its terminal phase.
    pub async fn run(mut self) {
        info!(instance = %self.name, "instance runtime started");

        while let Some(event) = self.event_rx.recv().await {
            self.handle_event(event).await;

            if self.core.is_terminal() {
                break;
            }
        }

        // Anything still queued (a late build pass, a second shutdown) is
        // answered by dropping its reply sender.
        self.event_rx.close();
        info!(instance = %self.name, "instance runtime finished");
    }

    async fn handle_event(&mut self, event: InstanceEvent) {
        match event {
            InstanceEvent::BuildCompleted { reply } => {
                let result = self.apply(LifecycleEvent::BuildCompleted).await;
                respond(reply, result);
            }
            InstanceEvent::Dependency(change) => {
                if !self.watchers.is_current(&change.path, change.watch_id) {
                    debug!(
                        instance = %self.name,
                        path = ?change.path,
                        watch_id = change.watch_id,
                        "dropping change from a closed watcher"
                    );
                    return;
                }
                let event = match change.kind {
                    ChangeKind::Content => LifecycleEvent::ContentChanged { path: change.path },
                    ChangeKind::Identity => LifecycleEvent::IdentityChanged { path: change.path },
                };
                if let Err(err) = self.apply(event).await {
                    error!(instance = %self.name, error = %err, "failed to handle dependency change");
                }
            }
            InstanceEvent::WorkerExited { generation, exit } => {
                if self.supervisor.generation() != Some(generation) {
                    debug!(
                        instance = %self.name,
                        generation,
                        "dropping exit notice from a replaced worker"
                    );
                    return;
                }
                debug!(instance = %self.name, generation, code = ?exit.code, "worker exit noticed");
                if let Err(err) = self.apply(LifecycleEvent::WorkerExited { generation }).await {
                    error!(instance = %self.name, error = %err, "failed to reap worker");
                }
            }
            InstanceEvent::ShutdownRequested { reply } => {
                let result = self.apply(LifecycleEvent::ShutdownRequested).await;
                respond(reply, result);
            }
            InstanceEvent::Inspect { reply } => {
                let _ = reply.send(self.status());
            }
        }
    }

    /// Step the core and run its commands in order.
    ///
    /// Every command is attempted; the first error is returned. A required
    /// dependency that can't be read or watched is special: the remaining commands are dropped and
    /// the instance is torn down instead.
    async fn apply(&mut self, event: LifecycleEvent) -> Result<()> {
        let step = self.core.step(event);
        let mut queue: VecDeque<LifecycleCommand> = step.commands.into();
        let mut first_error: Option<RelaunchError> = None;

        while let Some(command) = queue.pop_front() {
            let Err(err) = self.execute(command).await else {
                continue;
            };

            if let Some(path) = err.failed_dependency() {
                error!(
                    instance = %self.name,
                    path = ?path,
                    "required dependency cannot be read or watched; shutting instance down"
                );
                queue.clear();
                let teardown = self.core.step(LifecycleEvent::DependencyMissing { path: path.clone() });
                queue.extend(teardown.commands);
            } else {
                error!(instance = %self.name, error = %err, "lifecycle command failed");
            }
            first_error.get_or_insert(err);
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn execute(&mut self, command: LifecycleCommand) -> Result<()> {
        debug!(instance = %self.name, ?command, "executing lifecycle command");
        match command {
            LifecycleCommand::StartWorker => self.supervisor.start().await,
            LifecycleCommand::WatchDependency { role, path } => {
                self.watchers.watch(role, &path).await?;
                Ok(())
            }
            LifecycleCommand::CloseWatchers => {
                self.watchers.close_all();
                Ok(())
            }
            LifecycleCommand::StopWorker => {
                self.supervisor.stop().await;
                Ok(())
            }
            LifecycleCommand::ReapWorker { generation } => {
                if let Some(exit) = self.supervisor.reap(generation).await {
                    info!(
                        instance = %self.name,
                        generation,
                        code = ?exit.code,
                        "worker reaped; waiting for the next dependency change"
                    );
                }
                Ok(())
            }
            LifecycleCommand::RequestHostExit { reason } => {
                self.request_host_exit(reason);
                Ok(())
            }
        }
    }

    fn request_host_exit(&self, reason: ExitReason) {
        if !self.registry.claim_exit() {
            debug!(
                instance = %self.name,
                running = ?self.registry.running_instances(),
                "other workers still running; host stays up"
            );
            return;
        }

        info!(instance = %self.name, reason = %reason, "no workers left; requesting host exit");
        let exit = HostExit {
            last_instance: self.name.clone(),
            reason,
        };
        if self.host_exit.send(exit).is_err() {
            warn!(instance = %self.name, "host exit channel closed");
        }
    }

    fn status(&self) -> InstanceStatus {
        InstanceStatus {
            name: self.name.clone(),
            phase: self.core.phase().kind(),
            worker_pid: self.supervisor.pid(),
            worker_running: self.supervisor.is_running(),
            watched: self.watchers.paths(),
            restarts: self.core.restarts(),
        }
    }
}

fn respond(reply: Option<Reply<()>>, result: Result<()>) {
    if let Some(reply) = reply {
        let _ = reply.send(result);
    }
}

/// Cloneable handle used to drive one instance from outside.
#[derive(Debug, Clone)]
pub struct InstanceHandle {
    name: InstanceName,
    tx: mpsc::UnboundedSender<InstanceEvent>,
}

impl InstanceHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the instance runtime has finished.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Signal a completed build pass and wait until the instance handled it.
    ///
    /// The first call launches the worker and attaches the watchers; later
    /// calls are no-ops. Fails with [`RelaunchError::InstanceClosed`] once
    /// the instance has exited.
    pub async fn build_completed(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(InstanceEvent::BuildCompleted { reply: Some(reply) })
            .map_err(|_| RelaunchError::InstanceClosed(self.name.clone()))?;
        rx.await
            .map_err(|_| RelaunchError::InstanceClosed(self.name.clone()))?
    }

    /// Shut the instance down and wait until its worker has exited.
    ///
    /// Shutting down an instance that already exited succeeds immediately.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        if self
            .tx
            .send(InstanceEvent::ShutdownRequested { reply: Some(reply) })
            .is_err()
        {
            return Ok(());
        }
        rx.await.unwrap_or(Ok(()))
    }

    /// Current status, or `None` once the instance has exited.
    pub async fn status(&self) -> Option<InstanceStatus> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(InstanceEvent::Inspect { reply }).ok()?;
        rx.await.ok()
    }
}
