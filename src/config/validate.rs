// src/config/validate.rs

use crate::config::model::RawConfigFile;
use crate::errors::{RelaunchError, Result};

/// Structural checks on a freshly parsed config.
///
/// Option value types are checked later, when each instance's options are
/// converted (see `ServerOptions::from_toml_table`).
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_instances(cfg)?;
    validate_worker(cfg)?;
    validate_option_keys(cfg)?;
    Ok(())
}

fn ensure_has_instances(cfg: &RawConfigFile) -> Result<()> {
    if cfg.instance.is_empty() {
        return Err(RelaunchError::ConfigError(
            "config must contain at least one [instance.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_worker(cfg: &RawConfigFile) -> Result<()> {
    if cfg.worker.program.trim().is_empty() {
        return Err(RelaunchError::ConfigError(
            "[worker].program must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_option_keys(cfg: &RawConfigFile) -> Result<()> {
    for (name, options) in cfg.instance.iter() {
        if options.keys().any(|key| key.is_empty()) {
            return Err(RelaunchError::ConfigError(format!(
                "instance '{}' has an empty option name",
                name
            )));
        }
    }
    Ok(())
}
