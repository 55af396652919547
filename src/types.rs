// src/types.rs

use std::fmt;

/// Name of a supervised instance (the `<name>` in `[instance.<name>]`).
pub type InstanceName = String;

/// Which of an instance's two dependency files a path refers to.
///
/// - `Manifest`: required; an unreadable manifest is fatal to the instance.
/// - `Config`: optional; when missing the instance simply doesn't watch it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyRole {
    Manifest,
    Config,
}

impl DependencyRole {
    pub fn is_required(self) -> bool {
        matches!(self, DependencyRole::Manifest)
    }
}

impl fmt::Display for DependencyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyRole::Manifest => f.write_str("manifest"),
            DependencyRole::Config => f.write_str("config"),
        }
    }
}

/// How a watched dependency file changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// The file was written; its bytes may or may not differ.
    Content,
    /// The path was renamed or removed.
    Identity,
}
