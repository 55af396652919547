// src/logging.rs

//! Logging setup for `relaunch` using `tracing` + `tracing-subscriber`.
//!
//! Filter sources, first match wins:
//! 1. `--log-level` CLI flag
//! 2. `RELAUNCH_LOG`: a bare level ("debug", "warning") or full filter
//!    directives such as `relaunch::watch=debug,info`
//! 3. `info`
//!
//! Logs go to STDERR. The worker's own stdout is forwarded to ours verbatim,
//! so we keep it free of log lines.

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

/// Environment variable consulted when no `--log-level` is given.
pub const LOG_ENV_VAR: &str = "RELAUNCH_LOG";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV_VAR).ok();
    let (filter, rejected) = log_filter(cli_level, env.as_deref());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    if let Some(value) = rejected {
        tracing::warn!(var = LOG_ENV_VAR, %value, "ignoring unparsable log filter; using info");
    }
    Ok(())
}

/// Pick the filter for the given CLI flag and `RELAUNCH_LOG` value.
///
/// The second element is the env value when it had to be ignored.
pub fn log_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> (EnvFilter, Option<String>) {
    if let Some(level) = cli_level {
        return (level_filter(level_from_log_level(level)), None);
    }

    let Some(raw) = env.map(str::trim).filter(|s| !s.is_empty()) else {
        return (level_filter(tracing::Level::INFO), None);
    };

    if let Some(level) = parse_level_str(raw) {
        return (level_filter(level), None);
    }
    match EnvFilter::try_new(raw) {
        Ok(filter) => (filter, None),
        Err(_) => (level_filter(tracing::Level::INFO), Some(raw.to_string())),
    }
}

fn level_filter(level: tracing::Level) -> EnvFilter {
    EnvFilter::default().add_directive(LevelFilter::from_level(level).into())
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

/// Parse a bare level name, case-insensitive; "warning" means warn.
pub fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
