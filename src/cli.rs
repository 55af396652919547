// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `relaunch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "relaunch",
    version,
    about = "Keep a worker process running after each build, restarting it when its dependency files change.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Relaunch.toml` in the current working directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Shell command for the build pass.
    ///
    /// Workers are launched once it exits successfully. Without it, the build
    /// is assumed to have completed already and workers start immediately.
    #[arg(long, value_name = "CMD")]
    pub build: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RELAUNCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the resolved instances, but don't launch anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// The `--config` path, or the default location.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(default_config_path)
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
