// src/engine/registry.rs

//! Process-wide table of running workers.
//!
//! Every instance of one host process shares a clone of the same
//! [`InstanceRegistry`]. An instance is present in the table exactly while
//! its worker is running; the supervisor registers right after a successful
//! launch and unregisters once the process has fully exited.
//!
//! The registry is the only state shared between instances. Besides the
//! table it carries a one-shot latch so that, however many instances reach
//! their exit at the same time, only one of them gets to terminate the host.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::types::InstanceName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WorkerEntry {
    pid: Option<u32>,
    generation: u64,
}

#[derive(Debug, Default)]
struct RegistryState {
    workers: HashMap<InstanceName, WorkerEntry>,
    exit_claimed: bool,
}

/// Cloneable handle to a shared registry.
///
/// Create one per host process (or per test) and hand clones to each
/// instance.
#[derive(Debug, Clone, Default)]
pub struct InstanceRegistry {
    inner: Arc<Mutex<RegistryState>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        // Poisoning is ignored: every update is a single map operation.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record that `instance` now runs worker `generation`.
    pub fn register(&self, instance: &str, pid: Option<u32>, generation: u64) {
        let mut state = self.state();
        let previous = state
            .workers
            .insert(instance.to_string(), WorkerEntry { pid, generation });
        debug!(
            instance = %instance,
            ?pid,
            generation,
            replaced = previous.is_some(),
            running = state.workers.len(),
            "worker registered"
        );
    }

    /// Remove `instance` from the table. Returns whether it was present.
    pub fn unregister(&self, instance: &str) -> bool {
        let mut state = self.state();
        let removed = state.workers.remove(instance).is_some();
        if removed {
            debug!(
                instance = %instance,
                running = state.workers.len(),
                "worker unregistered"
            );
        }
        removed
    }

    /// True iff no instance in this host has a running worker.
    pub fn is_ready_for_exit(&self) -> bool {
        self.state().workers.is_empty()
    }

    /// Decide whether the caller may terminate the host.
    ///
    /// Returns `true` at most once over the registry's lifetime, and only
    /// when the table is empty at the moment of the call.
    pub fn claim_exit(&self) -> bool {
        let mut state = self.state();
        if state.exit_claimed || !state.workers.is_empty() {
            return false;
        }
        state.exit_claimed = true;
        info!("no running workers left; host exit claimed");
        true
    }

    /// Whether some instance already claimed the host exit.
    pub fn exit_claimed(&self) -> bool {
        self.state().exit_claimed
    }

    pub fn is_registered(&self, instance: &str) -> bool {
        self.state().workers.contains_key(instance)
    }

    pub fn worker_pid(&self, instance: &str) -> Option<u32> {
        self.state().workers.get(instance).and_then(|entry| entry.pid)
    }

    /// Number of instances with a running worker.
    pub fn running_count(&self) -> usize {
        self.state().workers.len()
    }

    /// Names of instances with a running worker, sorted.
    pub fn running_instances(&self) -> Vec<InstanceName> {
        let mut names: Vec<_> = self.state().workers.keys().cloned().collect();
        names.sort();
        names
    }
}
