// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelaunchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("option \"{key}\" must be of type {expected}, got {received}")]
    InvalidOption {
        key: String,
        expected: &'static str,
        received: &'static str,
    },

    #[error("required dependency file {path:?} could not be read: {source}")]
    MissingDependency {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("required dependency file {path:?} could not be watched: {source}")]
    UnwatchableDependency {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("failed to launch worker '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("file watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("instance '{0}' is no longer accepting requests")]
    InstanceClosed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RelaunchError {
    /// Path of the required dependency that could not be read or watched.
    ///
    /// Such an error ends the instance.
    pub fn failed_dependency(&self) -> Option<&PathBuf> {
        match self {
            RelaunchError::MissingDependency { path, .. }
            | RelaunchError::UnwatchableDependency { path, .. } => Some(path),
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RelaunchError>;
