// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::options::{ServerOptions, format_args};
use crate::config::paths::{DependencyPaths, resolve_dependency_paths};
use crate::config::validate::validate_config;
use crate::errors::Result;
use crate::types::InstanceName;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [worker]
/// program = "zat"
/// args = ["server"]
///
/// [instance.web]
/// path = "apps/web"
/// port = 5000
/// verbose = true
/// ```
///
/// Each `[instance.<name>]` table is the option map of one supervised
/// instance; key order inside it is the order of the generated flags.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// The executable every instance launches.
    #[serde(default)]
    pub worker: WorkerSection,

    /// All instances from `[instance.<name>]`.
    #[serde(default)]
    pub instance: BTreeMap<InstanceName, toml::Table>,
}

/// `[worker]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerSection {
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before the instance's own flags.
    #[serde(default = "default_leading_args")]
    pub args: Vec<String>,
}

fn default_program() -> String {
    "zat".to_string()
}

fn default_leading_args() -> Vec<String> {
    vec!["server".to_string()]
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_leading_args(),
        }
    }
}

/// One fully resolved instance: its formatted launch arguments and the
/// absolute paths of its dependency files.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceSpec {
    pub name: InstanceName,
    pub args: Vec<String>,
    pub dependencies: DependencyPaths,
}

impl InstanceSpec {
    /// Resolve `options` against `cwd`.
    ///
    /// Fails with [`crate::errors::RelaunchError::InvalidOption`] when `path` or `config`
    /// hold something other than a string.
    pub fn from_options(
        name: impl Into<InstanceName>,
        options: &ServerOptions,
        cwd: &Path,
    ) -> Result<Self> {
        let dependencies = resolve_dependency_paths(options, cwd)?;
        Ok(Self {
            name: name.into(),
            args: format_args(options),
            dependencies,
        })
    }

    pub fn manifest(&self) -> &Path {
        &self.dependencies.manifest
    }

    pub fn config(&self) -> &Path {
        &self.dependencies.config
    }
}

/// Validated configuration: worker command plus resolved instances.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub worker: WorkerSection,
    pub instances: Vec<InstanceSpec>,
    /// Directory relative option paths were resolved against.
    pub cwd: PathBuf,
}

impl ConfigFile {
    /// Validate `raw` and resolve every instance against `cwd`.
    pub fn resolve(raw: RawConfigFile, cwd: impl Into<PathBuf>) -> Result<Self> {
        validate_config(&raw)?;
        let cwd = cwd.into();

        let instances = raw
            .instance
            .iter()
            .map(|(name, table)| {
                let options = ServerOptions::from_toml_table(table)?;
                InstanceSpec::from_options(name.clone(), &options, &cwd)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            worker: raw.worker,
            instances,
            cwd,
        })
    }
}
