// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// This only performs TOML deserialization; option types and paths are not
/// checked yet. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path, validate it and resolve every
/// instance against `cwd`.
///
/// - Reads TOML.
/// - Applies `[worker]` defaults.
/// - Checks for:
///   - at least one instance,
///   - a non-empty worker program,
///   - option values of a supported type,
///   - string-valued `path` / `config`.
pub fn load_and_validate(path: impl AsRef<Path>, cwd: impl Into<PathBuf>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    ConfigFile::resolve(raw_config, cwd)
}

/// File name looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_PATH: &str = "Relaunch.toml";

/// Default config location, relative to the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_PATH)
}
