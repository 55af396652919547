#![allow(dead_code)]

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use relaunch::config::paths::{DEFAULT_CONFIG_FILE, MANIFEST_FILE};
use relaunch::config::{InstanceSpec, ServerOptions};

/// A temporary project directory holding an instance's dependency files.
///
/// The directory is removed when the fixture is dropped.
pub struct InstanceFixture {
    dir: TempDir,
}

impl InstanceFixture {
    /// Empty directory: no manifest, no config.
    pub fn empty() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    /// Directory with a `manifest.json` and a `settings.yml`.
    pub fn new() -> Self {
        let fixture = Self::empty();
        fixture.write(MANIFEST_FILE, "{\"entry\": \"main.js\"}\n");
        fixture.write(DEFAULT_CONFIG_FILE, "port: 5000\n");
        fixture
    }

    /// Directory with a `manifest.json` only.
    pub fn manifest_only() -> Self {
        let fixture = Self::empty();
        fixture.write(MANIFEST_FILE, "{\"entry\": \"main.js\"}\n");
        fixture
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn manifest(&self) -> PathBuf {
        self.dir.path().join(MANIFEST_FILE)
    }

    pub fn config(&self) -> PathBuf {
        self.dir.path().join(DEFAULT_CONFIG_FILE)
    }

    /// Overwrite (or create) `name` inside the fixture directory.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).expect("Failed to write fixture file");
        path
    }

    /// Options pointing `path` at the fixture directory.
    pub fn options(&self) -> ServerOptions {
        ServerOptions::new().with("path", self.dir().display().to_string())
    }

    /// Instance spec with `extra` options appended after `path`.
    pub fn spec(&self, name: &str, extra: ServerOptions) -> InstanceSpec {
        let mut options = self.options();
        for (key, value) in extra.iter() {
            options.insert(key, value.clone());
        }
        InstanceSpec::from_options(name, &options, self.dir())
            .expect("Failed to build instance spec from fixture")
    }
}

impl Default for InstanceFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a TOML config file, for loader tests.
pub struct ConfigTomlBuilder {
    worker: Option<(String, Vec<String>)>,
    instances: Vec<(String, Vec<(String, String)>)>,
}

impl ConfigTomlBuilder {
    pub fn new() -> Self {
        Self {
            worker: None,
            instances: Vec::new(),
        }
    }

    pub fn worker(mut self, program: &str, args: &[&str]) -> Self {
        self.worker = Some((
            program.to_string(),
            args.iter().map(|a| a.to_string()).collect(),
        ));
        self
    }

    /// Start a new `[instance.<name>]` table.
    pub fn instance(mut self, name: &str) -> Self {
        self.instances.push((name.to_string(), Vec::new()));
        self
    }

    /// Add `key = <raw TOML value>` to the most recent instance.
    pub fn option(mut self, key: &str, raw_value: &str) -> Self {
        let (_, options) = self
            .instances
            .last_mut()
            .expect("option() called before instance()");
        options.push((key.to_string(), raw_value.to_string()));
        self
    }

    pub fn build(self) -> String {
        let mut out = String::new();
        if let Some((program, args)) = self.worker {
            let args: Vec<String> = args.iter().map(|a| format!("{a:?}")).collect();
            writeln!(out, "[worker]").unwrap();
            writeln!(out, "program = {program:?}").unwrap();
            writeln!(out, "args = [{}]", args.join(", ")).unwrap();
            writeln!(out).unwrap();
        }
        for (name, options) in self.instances {
            writeln!(out, "[instance.{name}]").unwrap();
            for (key, value) in options {
                writeln!(out, "{key} = {value}").unwrap();
            }
            writeln!(out).unwrap();
        }
        out
    }
}

impl Default for ConfigTomlBuilder {
    fn default() -> Self {
        Self::new()
    }
}
