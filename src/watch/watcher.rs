// src/watch/watcher.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::InstanceEvent;
use crate::errors::{RelaunchError, Result};
use crate::types::{ChangeKind, DependencyRole, InstanceName};
use crate::watch::event_handler::{classify, forward_changes};
use crate::watch::snapshot::Snapshot;

/// Tuning for dependency watchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// How long to let a burst of write notices settle before re-reading.
    pub settle: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(50),
        }
    }
}

/// Handle for one active subscription.
///
/// Keeps the underlying `RecommendedWatcher` alive and owns the task that
/// turns its notices into dependency changes. Dropping the handle stops both.
pub struct WatchHandle {
    path: PathBuf,
    id: u64,
    _inner: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl WatchHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("path", &self.path)
            .field("id", &self.id)
            .finish()
    }
}

/// The dependency watchers of one instance, keyed by path.
///
/// At most one subscription exists per path. Every subscription gets a fresh
/// id; changes carry that id so the instance can tell whether they come from
/// the current subscription or a replaced one.
#[derive(Debug)]
pub struct WatcherSet {
    instance: InstanceName,
    watchers: HashMap<PathBuf, WatchHandle>,
    next_id: u64,
    options: WatchOptions,
    events: mpsc::UnboundedSender<InstanceEvent>,
}

impl WatcherSet {
    pub fn new(
        instance: impl Into<InstanceName>,
        options: WatchOptions,
        events: mpsc::UnboundedSender<InstanceEvent>,
    ) -> Self {
        Self {
            instance: instance.into(),
            watchers: HashMap::new(),
            next_id: 1,
            options,
            events,
        }
    }

    /// Read `path` and subscribe to its changes.
    ///
    /// - unreadable and required → [`RelaunchError::MissingDependency`]
    /// - unreadable and optional → `Ok(false)`, nothing is watched
    /// - readable → any previous subscription on `path` is closed, a new one
    ///   is installed with the content as its snapshot, `Ok(true)`
    /// - subscribing fails → [`RelaunchError::UnwatchableDependency`] when
    ///   required, [`RelaunchError::Watch`] otherwise
    pub async fn watch(&mut self, role: DependencyRole, path: &Path) -> Result<bool> {
        let snapshot = match Snapshot::read(path).await {
            Ok(snapshot) => snapshot,
            Err(source) if role.is_required() => {
                return Err(RelaunchError::MissingDependency {
                    path: path.to_path_buf(),
                    source,
                });
            }
            Err(err) => {
                debug!(
                    instance = %self.instance,
                    role = %role,
                    path = ?path,
                    error = %err,
                    "optional dependency not readable; not watching it"
                );
                return Ok(false);
            }
        };

        self.close(path);

        let id = self.next_id;
        self.next_id += 1;
        let handle = match self.subscribe(path, id, snapshot.clone()) {
            Ok(handle) => handle,
            Err(source) if role.is_required() => {
                return Err(RelaunchError::UnwatchableDependency {
                    path: path.to_path_buf(),
                    source,
                });
            }
            Err(source) => return Err(RelaunchError::Watch(source)),
        };

        info!(
            instance = %self.instance,
            role = %role,
            path = ?path,
            watch_id = id,
            digest = %snapshot.digest(),
            "watching dependency file"
        );
        self.watchers.insert(path.to_path_buf(), handle);
        Ok(true)
    }

    fn subscribe(&self, path: &Path, id: u64, snapshot: Snapshot) -> notify::Result<WatchHandle> {
        // Channel from the blocking notify callback into the async world.
        let (notice_tx, notice_rx) = mpsc::unbounded_channel::<ChangeKind>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Some(kind) = classify(&event.kind) {
                        // The receiver is gone once the watcher was closed.
                        let _ = notice_tx.send(kind);
                    }
                }
                Err(err) => warn!(error = %err, "file watch error"),
            },
            Config::default(),
        )?;

        watcher.watch(path, RecursiveMode::NonRecursive)?;

        let task = tokio::spawn(forward_changes(
            path.to_path_buf(),
            id,
            snapshot,
            notice_rx,
            self.events.clone(),
            self.options.settle,
        ));

        Ok(WatchHandle {
            path: path.to_path_buf(),
            id,
            _inner: watcher,
            task,
        })
    }

    /// Close the subscription on `path`, if any.
    pub fn close(&mut self, path: &Path) -> bool {
        match self.watchers.remove(path) {
            Some(handle) => {
                debug!(
                    instance = %self.instance,
                    path = ?path,
                    watch_id = handle.id,
                    "closing dependency watcher"
                );
                true
            }
            None => false,
        }
    }

    /// Close every subscription.
    pub fn close_all(&mut self) {
        if self.watchers.is_empty() {
            return;
        }
        info!(
            instance = %self.instance,
            count = self.watchers.len(),
            "closing dependency watchers"
        );
        self.watchers.clear();
    }

    /// Whether `id` is the live subscription for `path`.
    pub fn is_current(&self, path: &Path, id: u64) -> bool {
        self.watchers.get(path).is_some_and(|handle| handle.id == id)
    }

    pub fn current_id(&self, path: &Path) -> Option<u64> {
        self.watchers.get(path).map(|handle| handle.id)
    }

    pub fn is_watching(&self, path: &Path) -> bool {
        self.watchers.contains_key(path)
    }

    /// Watched paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.watchers.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }
}
