// src/exec/supervisor.rs

//! Per-instance worker supervisor.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::engine::{InstanceEvent, InstanceRegistry};
use crate::errors::Result;
use crate::exec::backend::{WorkerExit, WorkerLauncher, WorkerProcess};
use crate::types::InstanceName;

/// Internal handle for the currently-running worker.
///
/// - `cancel` asks the monitor task to terminate the process.
/// - `handle` is the monitor task; it resolves once the process has exited.
struct RunningWorker {
    generation: u64,
    pid: Option<u32>,
    cancel: Option<oneshot::Sender<()>>,
    handle: JoinHandle<WorkerExit>,
}

/// Owns at most one worker process for one instance.
///
/// [`start`](Self::start) always stops the previous worker (and waits for it
/// to exit) before launching the next one, so an instance never has two live
/// workers. The registry entry follows the process: it is added right after
/// a successful launch and removed only once the process has exited.
pub struct WorkerSupervisor<L: WorkerLauncher> {
    instance: InstanceName,
    args: Vec<String>,
    launcher: L,
    registry: InstanceRegistry,
    events: mpsc::UnboundedSender<InstanceEvent>,
    current: Option<RunningWorker>,
    next_generation: u64,
}

impl<L: WorkerLauncher> WorkerSupervisor<L> {
    pub fn new(
        instance: impl Into<InstanceName>,
        args: Vec<String>,
        launcher: L,
        registry: InstanceRegistry,
        events: mpsc::UnboundedSender<InstanceEvent>,
    ) -> Self {
        Self {
            instance: instance.into(),
            args,
            launcher,
            registry,
            events,
            current: None,
            next_generation: 1,
        }
    }

    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    /// Generation of the current worker. Increases with every launch.
    pub fn generation(&self) -> Option<u64> {
        self.current.as_ref().map(|w| w.generation)
    }

    pub fn pid(&self) -> Option<u32> {
        self.current.as_ref().and_then(|w| w.pid)
    }

    /// Stop the current worker (if any), then launch a fresh one.
    ///
    /// A launch failure is returned as-is and not retried; the instance is
    /// left without a worker.
    pub async fn start(&mut self) -> Result<()> {
        if let Some(exit) = self.stop().await {
            debug!(instance = %self.instance, ?exit, "previous worker stopped before start");
        }

        let process = self.launcher.launch(&self.args)?;
        let pid = process.id();
        let generation = self.next_generation;
        self.next_generation += 1;

        self.registry.register(&self.instance, pid, generation);

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(monitor_worker(
            self.instance.clone(),
            generation,
            process,
            cancel_rx,
            self.events.clone(),
        ));

        info!(
            instance = %self.instance,
            ?pid,
            generation,
            args = ?self.args,
            "worker started"
        );

        self.current = Some(RunningWorker {
            generation,
            pid,
            cancel: Some(cancel_tx),
            handle,
        });
        Ok(())
    }

    /// Terminate the current worker and wait until it has exited.
    ///
    /// Returns `None` immediately when no worker is running.
    pub async fn stop(&mut self) -> Option<WorkerExit> {
        let mut worker = self.current.take()?;

        if let Some(cancel) = worker.cancel.take() {
            if cancel.send(()).is_err() {
                debug!(
                    instance = %self.instance,
                    generation = worker.generation,
                    "worker already exited before stop"
                );
            }
        }

        let exit = match worker.handle.await {
            Ok(exit) => exit,
            Err(err) => {
                error!(
                    instance = %self.instance,
                    generation = worker.generation,
                    error = %err,
                    "worker monitor task failed"
                );
                WorkerExit::unknown()
            }
        };

        self.registry.unregister(&self.instance);
        info!(
            instance = %self.instance,
            pid = ?worker.pid,
            generation = worker.generation,
            code = ?exit.code,
            "worker stopped"
        );
        Some(exit)
    }

    /// Collect a worker that exited on its own.
    ///
    /// Does nothing unless `generation` is the current worker, so a late
    /// notice from an already replaced worker can't drop the new one.
    pub async fn reap(&mut self, generation: u64) -> Option<WorkerExit> {
        if self.generation() != Some(generation) {
            return None;
        }
        self.stop().await
    }
}

/// Watch one worker until it exits by itself or is asked to terminate.
///
/// A natural exit is reported to the instance as `InstanceEvent::WorkerExited`.
/// A requested termination is not reported: the supervisor is already
/// waiting on this task.
async fn monitor_worker(
    instance: InstanceName,
    generation: u64,
    mut process: Box<dyn WorkerProcess>,
    mut cancel_rx: oneshot::Receiver<()>,
    events: mpsc::UnboundedSender<InstanceEvent>,
) -> WorkerExit {
    tokio::select! {
        res = process.wait() => {
            let exit = res.unwrap_or_else(|err| {
                warn!(instance = %instance, generation, error = %err, "failed to wait for worker");
                WorkerExit::unknown()
            });

            warn!(
                instance = %instance,
                generation,
                code = ?exit.code,
                "worker exited on its own"
            );

            if events.send(InstanceEvent::WorkerExited { generation, exit }).is_err() {
                debug!(instance = %instance, generation, "instance gone; exit notice dropped");
            }
            exit
        }

        // Either an explicit stop, or the supervisor was dropped: terminate both ways.
        cancel = &mut cancel_rx => {
            if cancel.is_err() {
                debug!(instance = %instance, generation, "supervisor dropped; terminating worker");
            }
            match process.terminate().await {
                Ok(exit) => exit,
                Err(err) => {
                    warn!(
                        instance = %instance,
                        generation,
                        error = %err,
                        "failed to terminate worker"
                    );
                    WorkerExit::unknown()
                }
            }
        }
    }
}
