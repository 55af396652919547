#![allow(dead_code)]

use std::time::Duration;

use relaunch::engine::{InstanceHandle, InstanceStatus};

pub use relaunch_test_utils::builders;
pub use relaunch_test_utils::{FakeLauncher, init_tracing, wait_until, with_timeout};

/// Settle window used by runtime tests; short to keep them fast.
pub const TEST_SETTLE: Duration = Duration::from_millis(30);

/// Long enough for the platform watcher to deliver events and for the
/// settle window to pass, so the absence of a reaction can be asserted.
pub const QUIET_PERIOD: Duration = Duration::from_millis(400);

/// Give the platform watcher a moment to arm before touching files.
pub async fn let_watcher_arm() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

pub async fn status(handle: &InstanceHandle) -> InstanceStatus {
    handle.status().await.expect("instance unexpectedly closed")
}
