// src/engine/host.rs

//! All instances of one host process.

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::InstanceSpec;
use crate::errors::{RelaunchError, Result};
use crate::exec::WorkerLauncher;
use crate::types::InstanceName;
use crate::watch::WatchOptions;

use super::registry::InstanceRegistry;
use super::runtime::{InstanceHandle, spawn_instance};
use super::HostExit;

/// Owns the shared registry, the host-exit channel and a handle to every
/// instance spawned in this process.
///
/// Instances never terminate the process themselves. The one that empties
/// the registry sends a [`HostExit`], which the caller receives through
/// [`wait_for_exit`](Self::wait_for_exit) and acts on.
#[derive(Debug)]
pub struct Host {
    registry: InstanceRegistry,
    exit_tx: mpsc::UnboundedSender<HostExit>,
    exit_rx: mpsc::UnboundedReceiver<HostExit>,
    instances: BTreeMap<InstanceName, InstanceHandle>,
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

impl Host {
    pub fn new() -> Self {
        Self::with_registry(InstanceRegistry::new())
    }

    /// Build a host around an existing registry.
    pub fn with_registry(registry: InstanceRegistry) -> Self {
        let (exit_tx, exit_rx) = mpsc::unbounded_channel();
        Self {
            registry,
            exit_tx,
            exit_rx,
            instances: BTreeMap::new(),
        }
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    pub fn instance(&self, name: &str) -> Option<&InstanceHandle> {
        self.instances.get(name)
    }

    /// Handles of every spawned instance, by name.
    pub fn instances(&self) -> impl Iterator<Item = &InstanceHandle> {
        self.instances.values()
    }

    /// Spawn an idle instance. Names must be unique within a host.
    pub fn spawn_instance<L: WorkerLauncher>(
        &mut self,
        spec: &InstanceSpec,
        launcher: L,
        options: WatchOptions,
    ) -> Result<InstanceHandle> {
        if self.instances.contains_key(&spec.name) {
            return Err(RelaunchError::ConfigError(format!(
                "instance {:?} already exists",
                spec.name
            )));
        }

        let handle = spawn_instance(
            spec,
            launcher,
            self.registry.clone(),
            self.exit_tx.clone(),
            options,
        );
        debug!(instance = %spec.name, args = ?spec.args, "instance spawned");
        self.instances.insert(spec.name.clone(), handle.clone());
        Ok(handle)
    }

    /// Signal a completed build pass to every instance, in name order.
    pub async fn build_completed(&self) -> Vec<(InstanceName, Result<()>)> {
        let mut results = Vec::with_capacity(self.instances.len());
        for (name, handle) in &self.instances {
            let result = handle.build_completed().await;
            if let Err(err) = &result {
                warn!(instance = %name, error = %err, "instance failed to start");
            }
            results.push((name.clone(), result));
        }
        results
    }

    /// Ask every instance to shut down and wait for all of them.
    pub async fn shutdown_all(&self) {
        info!(count = self.instances.len(), "shutting down all instances");

        let mut set = JoinSet::new();
        for handle in self.instances.values() {
            let handle = handle.clone();
            set.spawn(async move {
                let result = handle.shutdown().await;
                (handle.name().to_string(), result)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((name, Err(err))) => {
                    warn!(instance = %name, error = %err, "instance shutdown failed");
                }
                Ok((name, Ok(()))) => debug!(instance = %name, "instance shut down"),
                Err(err) => warn!(error = %err, "shutdown task failed"),
            }
        }
    }

    /// Wait for the host-exit request.
    ///
    /// Returns `None` only if every sender is gone, which can't happen while
    /// the host itself is alive.
    pub async fn wait_for_exit(&mut self) -> Option<HostExit> {
        self.exit_rx.recv().await
    }

    /// Non-blocking check for a pending host-exit request.
    pub fn try_exit(&mut self) -> Option<HostExit> {
        self.exit_rx.try_recv().ok()
    }
}
