// src/exec/backend.rs

//! Pluggable worker launcher abstraction.
//!
//! The supervisor talks to a [`WorkerLauncher`] instead of building a
//! `tokio::process::Command` itself. This makes it easy to swap in a fake
//! launcher in tests while keeping the production implementation in
//! [`ProcessLauncher`].

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};
use tracing::debug;

use crate::errors::{RelaunchError, Result};

/// Boxed future returned by [`WorkerProcess`] methods.
pub type WorkerFuture<'a> = Pin<Box<dyn Future<Output = io::Result<WorkerExit>> + Send + 'a>>;

/// How a worker process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerExit {
    /// Exit code, or `None` when the process was ended by a signal or its
    /// status could not be collected.
    pub code: Option<i32>,
}

impl WorkerExit {
    pub fn from_status(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }

    pub fn unknown() -> Self {
        Self { code: None }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Trait abstracting how a worker process is launched.
///
/// Production code uses [`ProcessLauncher`]; tests can provide their own
/// implementation that doesn't spawn real processes.
pub trait WorkerLauncher: Send + Sync + 'static {
    /// Launch a worker with the instance's formatted arguments.
    ///
    /// Failing to launch is reported as [`RelaunchError::Spawn`].
    fn launch(&self, args: &[String]) -> Result<Box<dyn WorkerProcess>>;
}

/// A launched worker.
pub trait WorkerProcess: Send {
    /// OS process id, if known.
    fn id(&self) -> Option<u32>;

    /// Resolves when the process exits by itself.
    fn wait(&mut self) -> WorkerFuture<'_>;

    /// Request termination and resolve once the process has actually exited.
    fn terminate(&mut self) -> WorkerFuture<'_>;
}

/// Real launcher used in production.
///
/// Runs `program leading_args... instance_args...` with stdin closed and
/// stdout/stderr inherited, so the worker's output reaches the host's own
/// streams unchanged.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: String,
    leading_args: Vec<String>,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<String>, leading_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            leading_args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Full argument vector (without the program) for the given instance args.
    pub fn command_line(&self, args: &[String]) -> Vec<String> {
        self.leading_args.iter().chain(args).cloned().collect()
    }
}

impl WorkerLauncher for ProcessLauncher {
    fn launch(&self, args: &[String]) -> Result<Box<dyn WorkerProcess>> {
        let argv = self.command_line(args);
        debug!(program = %self.program, ?argv, "spawning worker process");

        let child = Command::new(&self.program)
            .args(&argv)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RelaunchError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        Ok(Box::new(ChildWorker { child }))
    }
}

struct ChildWorker {
    child: Child,
}

impl WorkerProcess for ChildWorker {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn wait(&mut self) -> WorkerFuture<'_> {
        Box::pin(async move {
            let status = self.child.wait().await?;
            Ok(WorkerExit::from_status(status))
        })
    }

    fn terminate(&mut self) -> WorkerFuture<'_> {
        Box::pin(async move {
            // Already exited: just collect the status.
            if let Some(status) = self.child.try_wait()? {
                return Ok(WorkerExit::from_status(status));
            }
            self.child.start_kill()?;
            let status = self.child.wait().await?;
            Ok(WorkerExit::from_status(status))
        })
    }
}
