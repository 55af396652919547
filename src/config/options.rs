// src/config/options.rs

//! Worker options: the per-instance option map and its translation into
//! command-line flags.
//!
//! Every option except the two reserved keys becomes a flag:
//!
//! - single-character key `p` → `-p`
//! - multi-character key `maxAge` → `--max-age`
//! - a string or number value is appended as the next argument
//! - an absent value yields the bare flag
//!
//! The reserved keys [`PATH_KEY`] and [`CONFIG_KEY`] are never passed through;
//! they locate the instance's dependency files instead (see
//! [`super::paths::resolve_dependency_paths`]).

use toml::Value;

use crate::errors::{RelaunchError, Result};

/// Reserved option naming the directory that holds `manifest.json`.
pub const PATH_KEY: &str = "path";

/// Reserved option naming the settings file.
pub const CONFIG_KEY: &str = "config";

/// A single option value.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    String(String),
    Integer(i64),
    Float(f64),
    /// Flag without an argument.
    Absent,
}

impl OptionValue {
    /// Type name used in configuration error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            OptionValue::String(_) => "string",
            OptionValue::Integer(_) | OptionValue::Float(_) => "number",
            OptionValue::Absent => "absent",
        }
    }

    /// The argument token that follows the flag, if any.
    ///
    /// Floats use Rust's shortest round-trip formatting, so `1.0` renders as
    /// `1` and `0.1` as `0.1`.
    pub fn to_arg(&self) -> Option<String> {
        match self {
            OptionValue::String(s) => Some(s.clone()),
            OptionValue::Integer(n) => Some(n.to_string()),
            OptionValue::Float(x) => Some(x.to_string()),
            OptionValue::Absent => None,
        }
    }

    /// Convert a TOML value.
    ///
    /// TOML has no null, so `true` stands for an absent value. Everything
    /// that isn't a string, a number or `true` is rejected.
    pub fn from_toml(key: &str, value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(OptionValue::String(s.clone())),
            Value::Integer(n) => Ok(OptionValue::Integer(*n)),
            Value::Float(x) if x.is_finite() => Ok(OptionValue::Float(*x)),
            Value::Float(x) => Err(RelaunchError::InvalidOption {
                key: key.to_string(),
                expected: "finite number",
                received: if x.is_nan() { "nan" } else { "infinity" },
            }),
            Value::Boolean(true) => Ok(OptionValue::Absent),
            other => Err(RelaunchError::InvalidOption {
                key: key.to_string(),
                expected: "string, number, or true",
                received: toml_type_name(other),
            }),
        }
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::String(s.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(s: String) -> Self {
        OptionValue::String(s)
    }
}

impl From<i64> for OptionValue {
    fn from(n: i64) -> Self {
        OptionValue::Integer(n)
    }
}

impl From<f64> for OptionValue {
    fn from(x: f64) -> Self {
        OptionValue::Float(x)
    }
}

fn toml_type_name(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "string",
        Value::Integer(_) | Value::Float(_) => "number",
        Value::Boolean(_) => "boolean",
        Value::Datetime(_) => "datetime",
        Value::Array(_) => "array",
        Value::Table(_) => "table",
    }
}

/// Ordered option map for one instance.
///
/// Insertion order is significant: it is the order of the generated flags.
/// Inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerOptions {
    entries: Vec<(String, OptionValue)>,
}

impl ServerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Builder-style insert of a bare flag.
    pub fn with_flag(mut self, key: impl Into<String>) -> Self {
        self.insert(key, OptionValue::Absent);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build options from an `[instance.<name>]` table, keeping key order.
    pub fn from_toml_table(table: &toml::Table) -> Result<Self> {
        let mut options = ServerOptions::new();
        for (key, value) in table {
            options.insert(key.clone(), OptionValue::from_toml(key, value)?);
        }
        Ok(options)
    }

    /// Look up a reserved key that must hold a string when present.
    pub fn string_option(&self, key: &str) -> Result<Option<&str>> {
        match self.get(key) {
            None => Ok(None),
            Some(OptionValue::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(RelaunchError::InvalidOption {
                key: key.to_string(),
                expected: "string",
                received: other.type_name(),
            }),
        }
    }
}

/// Whether `key` selects dependency files rather than producing a flag.
pub fn is_reserved_key(key: &str) -> bool {
    key == PATH_KEY || key == CONFIG_KEY
}

/// Translate an option key into its flag.
///
/// Keys of exactly one character become short flags; longer keys become long
/// flags, with every uppercase letter turned into `-` plus its lowercase form.
pub fn flag_for_key(key: &str) -> String {
    if key.chars().count() == 1 {
        return format!("-{key}");
    }

    let mut flag = String::with_capacity(key.len() + 4);
    flag.push_str("--");
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            flag.push('-');
            flag.push(c.to_ascii_lowercase());
        } else {
            flag.extend(c.to_lowercase());
        }
    }
    flag
}

/// Produce the worker argument list for `options`, in insertion order.
pub fn format_args(options: &ServerOptions) -> Vec<String> {
    options
        .iter()
        .filter(|(key, _)| !is_reserved_key(key))
        .flat_map(|(key, value)| std::iter::once(flag_for_key(key)).chain(value.to_arg()))
        .collect()
}
