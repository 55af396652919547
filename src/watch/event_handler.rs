// src/watch/event_handler.rs

//! Event processing logic for one watched dependency file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::EventKind;
use notify::event::ModifyKind;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{DependencyChange, InstanceEvent};
use crate::types::ChangeKind;
use crate::watch::snapshot::Snapshot;

/// Map a raw notify event onto the two notifications we care about.
///
/// - rename / remove → [`ChangeKind::Identity`]
/// - data, metadata, create or unspecified → [`ChangeKind::Content`]
///   (the content check decides whether anything really changed)
/// - access and backend-specific events → ignored
pub fn classify(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Modify(ModifyKind::Name(_)) | EventKind::Remove(_) => Some(ChangeKind::Identity),
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Any => Some(ChangeKind::Content),
        EventKind::Access(_) | EventKind::Other => None,
    }
}

/// Consume classified notices for one path and forward real changes.
///
/// Content notices are coalesced: after the first one we wait `settle`, fold
/// everything that queued up meanwhile into it (an identity notice wins),
/// then read the file once. Only bytes that differ from `snapshot` produce a
/// `ContentChanged` change; identical or unreadable content is dropped.
///
/// An identity notice is forwarded unconditionally and ends the loop: the
/// path no longer refers to the file we subscribed to.
pub async fn forward_changes(
    path: PathBuf,
    watch_id: u64,
    mut snapshot: Snapshot,
    mut notices: mpsc::UnboundedReceiver<ChangeKind>,
    events: mpsc::UnboundedSender<InstanceEvent>,
    settle: Duration,
) {
    while let Some(first) = notices.recv().await {
        let mut kind = first;
        if kind == ChangeKind::Content && !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }
        while let Ok(next) = notices.try_recv() {
            if next == ChangeKind::Identity {
                kind = ChangeKind::Identity;
            }
        }

        match kind {
            ChangeKind::Identity => {
                info!(path = ?path, watch_id, "watched path renamed or removed");
                send_change(&events, &path, watch_id, ChangeKind::Identity);
                break;
            }
            ChangeKind::Content => match Snapshot::read(&path).await {
                Ok(current) if snapshot.differs_from(current.as_bytes()) => {
                    debug!(
                        path = ?path,
                        watch_id,
                        old = %snapshot.digest(),
                        new = %current.digest(),
                        "dependency content differs from snapshot"
                    );
                    snapshot = current;
                    if !send_change(&events, &path, watch_id, ChangeKind::Content) {
                        break;
                    }
                }
                Ok(_) => {
                    debug!(path = ?path, watch_id, "content unchanged; ignoring event");
                }
                Err(err) => {
                    debug!(path = ?path, watch_id, error = %err, "could not re-read file; ignoring event");
                }
            },
        }
    }
    debug!(path = ?path, watch_id, "watcher event loop finished");
}

fn send_change(
    events: &mpsc::UnboundedSender<InstanceEvent>,
    path: &Path,
    watch_id: u64,
    kind: ChangeKind,
) -> bool {
    let change = DependencyChange {
        path: path.to_path_buf(),
        watch_id,
        kind,
    };
    if let Err(err) = events.send(InstanceEvent::Dependency(change)) {
        warn!(path = ?path, "failed to forward dependency change: {err}");
        return false;
    }
    true
}
