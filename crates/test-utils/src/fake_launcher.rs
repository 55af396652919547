use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;
use relaunch::errors::{RelaunchError, Result};
use relaunch::exec::{WorkerExit, WorkerFuture, WorkerLauncher, WorkerProcess};

const FIRST_PID: u32 = 1000;

#[derive(Default)]
struct LauncherState {
    launches: Vec<Vec<String>>,
    terminated: Vec<u32>,
    live: BTreeMap<u32, oneshot::Sender<i32>>,
    next_pid: u32,
    fail_spawns: bool,
}

/// A fake launcher that:
/// - records the argument list of every launch
/// - hands out fake workers with increasing pids that stay "running" until
///   terminated or told to exit via [`FakeLauncher::exit_worker`]
/// - can be switched to fail every launch.
///
/// Clones share state, so a test keeps one clone for assertions and gives
/// another to the instance.
#[derive(Clone, Default)]
pub struct FakeLauncher {
    state: Arc<Mutex<LauncherState>>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LauncherState> {
        self.state.lock().unwrap()
    }

    /// Argument lists of all launches so far, oldest first.
    pub fn launches(&self) -> Vec<Vec<String>> {
        self.state().launches.clone()
    }

    pub fn launch_count(&self) -> usize {
        self.state().launches.len()
    }

    /// Pids of workers that were terminated, in order.
    pub fn terminated(&self) -> Vec<u32> {
        self.state().terminated.clone()
    }

    pub fn termination_count(&self) -> usize {
        self.state().terminated.len()
    }

    /// Workers launched and neither terminated nor exited.
    pub fn live_count(&self) -> usize {
        self.state().live.len()
    }

    pub fn live_pids(&self) -> Vec<u32> {
        self.state().live.keys().copied().collect()
    }

    /// Make every following launch fail (or succeed again).
    pub fn fail_spawns(&self, fail: bool) {
        self.state().fail_spawns = fail;
    }

    /// Let the worker with `pid` exit by itself with `code`.
    ///
    /// Returns `false` if no such worker is live.
    pub fn exit_worker(&self, pid: u32, code: i32) -> bool {
        match self.state().live.remove(&pid) {
            Some(tx) => tx.send(code).is_ok(),
            None => false,
        }
    }
}

impl WorkerLauncher for FakeLauncher {
    fn launch(&self, args: &[String]) -> Result<Box<dyn WorkerProcess>> {
        let mut state = self.state();
        if state.fail_spawns {
            return Err(RelaunchError::Spawn {
                program: "fake-worker".to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "fake launch failure"),
            });
        }

        state.launches.push(args.to_vec());
        let pid = FIRST_PID + state.next_pid;
        state.next_pid += 1;

        let (exit_tx, exit_rx) = oneshot::channel();
        state.live.insert(pid, exit_tx);

        Ok(Box::new(FakeWorker {
            pid,
            exit_rx,
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeWorker {
    pid: u32,
    exit_rx: oneshot::Receiver<i32>,
    state: Arc<Mutex<LauncherState>>,
}

impl WorkerProcess for FakeWorker {
    fn id(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn wait(&mut self) -> WorkerFuture<'_> {
        Box::pin(async move {
            match (&mut self.exit_rx).await {
                Ok(code) => Ok(WorkerExit { code: Some(code) }),
                // Sender dropped without an exit: behave like a process that
                // never exits on its own.
                Err(_) => std::future::pending().await,
            }
        })
    }

    fn terminate(&mut self) -> WorkerFuture<'_> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.live.remove(&self.pid);
            state.terminated.push(self.pid);
            Ok(WorkerExit::unknown())
        })
    }
}
