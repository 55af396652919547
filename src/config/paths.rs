// src/config/paths.rs

//! Dependency file resolution.

use std::path::{Component, Path, PathBuf};

use crate::config::options::{CONFIG_KEY, PATH_KEY, ServerOptions};
use crate::errors::Result;

/// File name of the manifest inside the `path` directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Settings file used when no `config` option is given.
pub const DEFAULT_CONFIG_FILE: &str = "settings.yml";

/// Absolute locations of an instance's two dependency files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyPaths {
    /// Required; `<path>/manifest.json`.
    pub manifest: PathBuf,
    /// Optional; the `config` option itself.
    pub config: PathBuf,
}

/// Resolve the manifest and config locations for `options` against `cwd`.
///
/// - `path` absent → `<cwd>/manifest.json`, else `resolve(path)/manifest.json`
/// - `config` absent → `<cwd>/settings.yml`, else `resolve(config)`
///
/// Both reserved keys must hold strings when present.
pub fn resolve_dependency_paths(options: &ServerOptions, cwd: &Path) -> Result<DependencyPaths> {
    let manifest_dir = match options.string_option(PATH_KEY)? {
        Some(dir) => resolve_path(cwd, dir),
        None => normalize(cwd),
    };

    let config = match options.string_option(CONFIG_KEY)? {
        Some(file) => resolve_path(cwd, file),
        None => normalize(&cwd.join(DEFAULT_CONFIG_FILE)),
    };

    Ok(DependencyPaths {
        manifest: manifest_dir.join(MANIFEST_FILE),
        config,
    })
}

/// Absolute paths are kept as they are; relative ones are joined onto `cwd`.
/// The result is lexically normalised either way.
pub fn resolve_path(cwd: &Path, path: impl AsRef<Path>) -> PathBuf {
    normalize(&cwd.join(path))
}

/// Remove `.` segments and fold `..` into its parent, without touching the
/// filesystem. `..` at the root stays at the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }

    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
