// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;
pub mod watch;

use std::process::Stdio;

use anyhow::{Context, Result, bail};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::Host;
use crate::exec::ProcessLauncher;
use crate::watch::WatchOptions;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - one instance runtime per `[instance.<name>]`
/// - the optional build command, whose success is the build notification
/// - Ctrl-C and SIGTERM handling
/// - waiting for the host-exit request
pub async fn run(args: CliArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    let config_path = args.config_path();
    let cfg = load_and_validate(&config_path, cwd)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    // Installed before any worker exists, so an early SIGTERM still shuts them down.
    let mut terminate = TerminateSignal::install()?;

    let launcher = ProcessLauncher::new(cfg.worker.program.clone(), cfg.worker.args.clone());
    let mut host = Host::new();
    for spec in &cfg.instances {
        host.spawn_instance(spec, launcher.clone(), WatchOptions::default())?;
    }

    if let Some(build) = &args.build {
        run_build(build).await?;
    }

    let results = host.build_completed().await;
    let failed = results.iter().filter(|(_, r)| r.is_err()).count();
    if failed == results.len() {
        let (name, first) = results
            .into_iter()
            .find_map(|(name, r)| r.err().map(|e| (name, e)))
            .context("no instances configured")?;
        return Err(anyhow::Error::new(first).context(format!("instance {name:?} failed to start")));
    }
    if failed > 0 {
        warn!(failed, total = results.len(), "some instances failed to start");
    }

    tokio::select! {
        exit = host.wait_for_exit() => {
            match exit {
                Some(exit) => info!(
                    last_instance = %exit.last_instance,
                    reason = %exit.reason,
                    "all workers stopped; exiting"
                ),
                None => debug!("host exit channel closed"),
            }
        }
        res = tokio::signal::ctrl_c() => {
            if let Err(err) = res {
                warn!(error = %err, "failed to listen for Ctrl+C");
            }
            info!("interrupt received; shutting down");
            host.shutdown_all().await;
            if let Some(exit) = host.try_exit() {
                debug!(last_instance = %exit.last_instance, "host exit after interrupt");
            }
        }
        _ = terminate.recv() => {
            info!("termination signal received; shutting down");
            host.shutdown_all().await;
            if let Some(exit) = host.try_exit() {
                debug!(last_instance = %exit.last_instance, "host exit after termination signal");
            }
        }
    }

    Ok(())
}

/// SIGTERM listener. Never fires on platforms without it.
struct TerminateSignal {
    #[cfg(unix)]
    inner: tokio::signal::unix::Signal,
}

impl TerminateSignal {
    #[cfg(unix)]
    fn install() -> Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        let inner = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
        Ok(Self { inner })
    }

    #[cfg(not(unix))]
    fn install() -> Result<Self> {
        Ok(Self {})
    }

    #[cfg(unix)]
    async fn recv(&mut self) {
        if self.inner.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) {
        std::future::pending::<()>().await
    }
}

/// Run the build pass through the platform shell.
async fn run_build(command: &str) -> Result<()> {
    info!(%command, "running build command");

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    };

    let status = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .with_context(|| format!("failed to run build command {command:?}"))?;

    if !status.success() {
        bail!("build command {command:?} failed with {status}");
    }
    Ok(())
}

/// Print each instance's command line and dependency files.
fn print_dry_run(cfg: &ConfigFile) {
    println!("relaunch dry-run");
    println!("  worker.program = {}", cfg.worker.program);
    println!("  worker.args = {:?}", cfg.worker.args);
    println!("  cwd = {}", cfg.cwd.display());
    println!();

    let launcher = ProcessLauncher::new(cfg.worker.program.clone(), cfg.worker.args.clone());
    println!("instances ({}):", cfg.instances.len());
    for spec in &cfg.instances {
        println!("  - {}", spec.name);
        println!(
            "      cmd: {} {}",
            launcher.program(),
            launcher.command_line(&spec.args).join(" ")
        );
        println!("      manifest: {}", spec.manifest().display());
        println!("      config: {}", spec.config().display());
    }

    debug!("dry-run complete (nothing launched)");
}
