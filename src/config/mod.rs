// src/config/mod.rs

//! Configuration for relaunch.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Turn an instance's option map into worker flags (`options.rs`).
//! - Resolve the manifest / config dependency files (`paths.rs`).
//! - Load a config file from disk (`loader.rs`) and validate it (`validate.rs`).

pub mod loader;
pub mod model;
pub mod options;
pub mod paths;
pub mod validate;

pub use loader::{DEFAULT_CONFIG_PATH, default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, InstanceSpec, RawConfigFile, WorkerSection};
pub use options::{OptionValue, ServerOptions, flag_for_key, format_args};
pub use paths::{DependencyPaths, resolve_dependency_paths};
pub use validate::validate_config;
