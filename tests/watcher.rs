// tests/watcher.rs

mod common;

use std::fs;

use tokio::sync::mpsc;
use tokio::time::timeout;

use relaunch::engine::{DependencyChange, InstanceEvent};
use relaunch::errors::RelaunchError;
use relaunch::types::{ChangeKind, DependencyRole};
use relaunch::watch::{WatchOptions, WatcherSet};

use crate::common::builders::InstanceFixture;
use crate::common::{QUIET_PERIOD, TEST_SETTLE, init_tracing, let_watcher_arm, with_timeout};

fn watcher_set() -> (WatcherSet, mpsc::UnboundedReceiver<InstanceEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let options = WatchOptions { settle: TEST_SETTLE };
    (WatcherSet::new("test", options, tx), rx)
}

async fn next_change(rx: &mut mpsc::UnboundedReceiver<InstanceEvent>) -> DependencyChange {
    with_timeout(async {
        loop {
            match rx.recv().await.expect("event channel closed") {
                InstanceEvent::Dependency(change) => return change,
                other => panic!("unexpected event: {other:?}"),
            }
        }
    })
    .await
}

async fn assert_quiet(rx: &mut mpsc::UnboundedReceiver<InstanceEvent>) {
    if let Ok(Some(event)) = timeout(QUIET_PERIOD, rx.recv()).await {
        panic!("expected no event, got {event:?}");
    }
}

#[tokio::test]
async fn missing_required_file_is_an_error() {
    init_tracing();
    let fixture = InstanceFixture::empty();
    let (mut set, _rx) = watcher_set();

    let result = set.watch(DependencyRole::Manifest, &fixture.manifest()).await;

    match result {
        Err(RelaunchError::MissingDependency { path, .. }) => assert_eq!(path, fixture.manifest()),
        other => panic!("expected MissingDependency, got {other:?}"),
    }
    assert!(set.is_empty());
}

#[tokio::test]
async fn missing_optional_file_is_skipped() {
    init_tracing();
    let fixture = InstanceFixture::manifest_only();
    let (mut set, _rx) = watcher_set();

    let watched = set.watch(DependencyRole::Config, &fixture.config()).await.unwrap();

    assert!(!watched);
    assert!(!set.is_watching(&fixture.config()));
}

#[tokio::test]
async fn changed_bytes_produce_one_content_change() {
    init_tracing();
    let fixture = InstanceFixture::new();
    let (mut set, mut rx) = watcher_set();
    let manifest = fixture.manifest();

    assert!(set.watch(DependencyRole::Manifest, &manifest).await.unwrap());
    let id = set.current_id(&manifest).unwrap();
    let_watcher_arm().await;

    fs::write(&manifest, "{\"entry\": \"other.js\"}\n").unwrap();

    let change = next_change(&mut rx).await;
    assert_eq!(change.kind, ChangeKind::Content);
    assert_eq!(change.path, manifest);
    assert_eq!(change.watch_id, id);
    assert_quiet(&mut rx).await;
}

#[tokio::test]
async fn identical_bytes_produce_nothing() {
    init_tracing();
    let fixture = InstanceFixture::new();
    let (mut set, mut rx) = watcher_set();
    let config = fixture.config();

    set.watch(DependencyRole::Config, &config).await.unwrap();
    let_watcher_arm().await;

    fs::write(&config, "port: 5000\n").unwrap();

    assert_quiet(&mut rx).await;
}

#[tokio::test]
async fn snapshot_follows_the_latest_content() {
    init_tracing();
    let fixture = InstanceFixture::new();
    let (mut set, mut rx) = watcher_set();
    let config = fixture.config();

    set.watch(DependencyRole::Config, &config).await.unwrap();
    let_watcher_arm().await;

    fs::write(&config, "port: 6000\n").unwrap();
    assert_eq!(next_change(&mut rx).await.kind, ChangeKind::Content);

    // Writing the new content again is not a change any more.
    fs::write(&config, "port: 6000\n").unwrap();
    assert_quiet(&mut rx).await;
}

#[tokio::test]
async fn rename_produces_an_identity_change() {
    init_tracing();
    let fixture = InstanceFixture::new();
    let (mut set, mut rx) = watcher_set();
    let manifest = fixture.manifest();

    set.watch(DependencyRole::Manifest, &manifest).await.unwrap();
    let_watcher_arm().await;

    fs::rename(&manifest, fixture.dir().join("manifest.json.bak")).unwrap();

    let change = next_change(&mut rx).await;
    assert_eq!(change.kind, ChangeKind::Identity);
    assert_eq!(change.path, manifest);
}

#[tokio::test]
async fn delete_produces_an_identity_change() {
    init_tracing();
    let fixture = InstanceFixture::new();
    let (mut set, mut rx) = watcher_set();
    let config = fixture.config();

    set.watch(DependencyRole::Config, &config).await.unwrap();
    let_watcher_arm().await;

    fs::remove_file(&config).unwrap();

    assert_eq!(next_change(&mut rx).await.kind, ChangeKind::Identity);
}

#[tokio::test]
async fn rewatching_a_path_replaces_the_subscription() {
    init_tracing();
    let fixture = InstanceFixture::new();
    let (mut set, mut rx) = watcher_set();
    let manifest = fixture.manifest();

    set.watch(DependencyRole::Manifest, &manifest).await.unwrap();
    let first = set.current_id(&manifest).unwrap();
    set.watch(DependencyRole::Manifest, &manifest).await.unwrap();
    let second = set.current_id(&manifest).unwrap();

    assert_ne!(first, second);
    assert_eq!(set.len(), 1);
    assert!(!set.is_current(&manifest, first));
    assert!(set.is_current(&manifest, second));

    let_watcher_arm().await;
    fs::write(&manifest, "{}").unwrap();

    // Only the live subscription reports.
    let change = next_change(&mut rx).await;
    assert_eq!(change.watch_id, second);
    assert_quiet(&mut rx).await;
}

#[tokio::test]
async fn closed_watchers_report_nothing() {
    init_tracing();
    let fixture = InstanceFixture::new();
    let (mut set, mut rx) = watcher_set();

    set.watch(DependencyRole::Manifest, &fixture.manifest()).await.unwrap();
    set.watch(DependencyRole::Config, &fixture.config()).await.unwrap();
    assert_eq!(set.paths(), {
        let mut paths = vec![fixture.manifest(), fixture.config()];
        paths.sort();
        paths
    });

    set.close_all();
    assert!(set.is_empty());

    fs::write(fixture.manifest(), "{}").unwrap();
    fs::remove_file(fixture.config()).unwrap();
    assert_quiet(&mut rx).await;
}

#[test]
fn required_dependency_that_cannot_be_watched_ends_the_instance() {
    let path = std::path::PathBuf::from("/srv/web/manifest.json");

    let unwatchable = RelaunchError::UnwatchableDependency {
        path: path.clone(),
        source: notify::Error::generic("inotify watch limit reached"),
    };
    assert_eq!(unwatchable.failed_dependency(), Some(&path));
    assert!(unwatchable.to_string().contains("could not be watched"));

    let missing = RelaunchError::MissingDependency {
        path: path.clone(),
        source: std::io::Error::from(std::io::ErrorKind::NotFound),
    };
    assert_eq!(missing.failed_dependency(), Some(&path));

    // A watch failure on the optional config is logged, not fatal.
    let optional = RelaunchError::Watch(notify::Error::generic("inotify watch limit reached"));
    assert_eq!(optional.failed_dependency(), None);
}
