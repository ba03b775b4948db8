// src/environment.rs

//! Layered build environment with template resolution
//!
//! The environment is assembled from JSON layers given in a fixed order;
//! a key in a later layer replaces the same key from an earlier one
//! wholesale (no deep merge). After merging, `{{name}}` placeholders in
//! string values are substituted in whole-environment passes until a pass
//! performs zero replacements, bounded by [`MAX_SUBSTITUTION_PASSES`].
//!
//! Two keys are reserved:
//! - `prefix`: the toolchain installation root. After resolution it is
//!   user-expanded, absolute, and symlink-resolved, and the directory
//!   exists.
//! - `default-targets`: an ordered list of target tokens, consulted only
//!   when the command line supplies none.

use crate::error::{Error, Result};
use regex::Regex;
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;
use tracing::debug;

/// Reserved key holding the installation root
pub const PREFIX_KEY: &str = "prefix";

/// Reserved key holding the default target list
pub const DEFAULT_TARGETS_KEY: &str = "default-targets";

/// Installation root used when the environment does not set one
pub const DEFAULT_PREFIX: &str = "/opt/crossforge";

/// Substitution pass cap; exceeding it signals a cyclic reference
pub const MAX_SUBSTITUTION_PASSES: usize = 100;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Za-z0-9_.-]+)\}\}").expect("placeholder regex is valid"));

/// The resolved build environment
#[derive(Debug, Clone, Default)]
pub struct Environment {
    values: Map<String, Value>,
}

impl Environment {
    /// Load JSON layer files in order and resolve them
    ///
    /// Each file must contain a single JSON object. A missing or malformed
    /// file is a configuration error.
    pub fn from_files(paths: &[PathBuf]) -> Result<Self> {
        let mut layers = Vec::with_capacity(paths.len());
        for path in paths {
            let text = fs::read_to_string(path).map_err(|e| {
                Error::Configuration(format!("cannot read envfile {}: {}", path.display(), e))
            })?;
            let value: Value = serde_json::from_str(&text).map_err(|e| {
                Error::Configuration(format!("cannot parse envfile {}: {}", path.display(), e))
            })?;
            match value {
                Value::Object(map) => layers.push(map),
                _ => {
                    return Err(Error::Configuration(format!(
                        "envfile {} does not contain a JSON object",
                        path.display()
                    )));
                }
            }
        }
        Self::resolve(layers)
    }

    /// Merge layers in order and resolve all template references
    ///
    /// Pure apart from the post-condition on the `prefix` key: the install
    /// root is normalized and its directory created (idempotent).
    pub fn resolve(layers: Vec<Map<String, Value>>) -> Result<Self> {
        let mut values = Map::new();
        for layer in layers {
            for (key, value) in layer {
                values.insert(key, value);
            }
        }

        substitute_to_fixed_point(&mut values)?;

        let mut env = Self { values };
        env.normalize_prefix()?;
        Ok(env)
    }

    /// Look up a raw value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Look up a string value
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// The normalized installation root
    pub fn prefix(&self) -> PathBuf {
        PathBuf::from(self.get_str(PREFIX_KEY).unwrap_or(DEFAULT_PREFIX))
    }

    /// The declared default target list, if any
    ///
    /// Returns a configuration error if the key is present but is not a
    /// list of strings.
    pub fn default_targets(&self) -> Result<Option<Vec<String>>> {
        let value = match self.values.get(DEFAULT_TARGETS_KEY) {
            Some(v) => v,
            None => return Ok(None),
        };
        let items = value.as_array().ok_or_else(|| {
            Error::Configuration(format!("{} must be a list of strings", DEFAULT_TARGETS_KEY))
        })?;
        let mut targets = Vec::with_capacity(items.len());
        for item in items {
            let token = item.as_str().ok_or_else(|| {
                Error::Configuration(format!("{} must be a list of strings", DEFAULT_TARGETS_KEY))
            })?;
            targets.push(token.to_string());
        }
        Ok(Some(targets))
    }

    /// Normalize the install prefix: expand `~`, make absolute, resolve
    /// symlinks, and create the directory if missing.
    fn normalize_prefix(&mut self) -> Result<()> {
        let raw = self
            .get_str(PREFIX_KEY)
            .unwrap_or(DEFAULT_PREFIX)
            .to_string();

        let expanded = expand_user(&raw);
        let absolute = if expanded.is_absolute() {
            expanded
        } else {
            std::env::current_dir()?.join(expanded)
        };

        fs::create_dir_all(&absolute).map_err(|e| {
            Error::Configuration(format!(
                "cannot create install prefix {}: {}",
                absolute.display(),
                e
            ))
        })?;
        let resolved = fs::canonicalize(&absolute)?;
        debug!("install prefix: {}", resolved.display());

        self.values.insert(
            PREFIX_KEY.to_string(),
            Value::String(resolved.to_string_lossy().into_owned()),
        );
        Ok(())
    }
}

/// Expand a leading `~` to the user's home directory
fn expand_user(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    if path == "~"
        && let Some(home) = dirs::home_dir()
    {
        return home;
    }
    PathBuf::from(path)
}

/// Run whole-environment substitution passes until a fixed point
fn substitute_to_fixed_point(values: &mut Map<String, Value>) -> Result<()> {
    for pass in 0..MAX_SUBSTITUTION_PASSES {
        // References resolve against the environment as it stood when the
        // pass began, so a pass is deterministic regardless of key order.
        let snapshot = values.clone();
        let mut replacements = 0;

        for (key, value) in values.iter_mut() {
            substitute_value(key, value, &snapshot, &mut replacements)?;
        }

        if replacements == 0 {
            debug!("environment settled after {} pass(es)", pass + 1);
            return Ok(());
        }
    }
    Err(Error::RecursionLimitExceeded(MAX_SUBSTITUTION_PASSES))
}

/// Substitute placeholders in every string leaf under `value`
fn substitute_value(
    key: &str,
    value: &mut Value,
    snapshot: &Map<String, Value>,
    replacements: &mut usize,
) -> Result<()> {
    match value {
        Value::String(s) => {
            let (replaced, count) = substitute_str(key, s, snapshot)?;
            if count > 0 {
                *s = replaced;
                *replacements += count;
            }
        }
        Value::Array(items) => {
            for item in items {
                substitute_value(key, item, snapshot, replacements)?;
            }
        }
        Value::Object(map) => {
            for nested in map.values_mut() {
                substitute_value(key, nested, snapshot, replacements)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Replace every `{{name}}` in `s` with the referenced string value
///
/// A reference to a key that is absent, or whose value is not a string,
/// fails. Returns the new string and the number of replacements made.
fn substitute_str(key: &str, s: &str, snapshot: &Map<String, Value>) -> Result<(String, usize)> {
    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    let mut count = 0;

    for caps in PLACEHOLDER.captures_iter(s) {
        let whole = caps.get(0).expect("capture 0 always present");
        let name = &caps[1];
        let replacement = snapshot.get(name).and_then(Value::as_str).ok_or_else(|| {
            Error::UnresolvedReference {
                key: key.to_string(),
                reference: name.to_string(),
            }
        })?;
        out.push_str(&s[last..whole.start()]);
        out.push_str(replacement);
        last = whole.end();
        count += 1;
    }
    out.push_str(&s[last..]);
    Ok((out, count))
}

/// Check whether any string leaf still contains placeholder syntax
pub fn contains_placeholder(value: &Value) -> bool {
    match value {
        Value::String(s) => PLACEHOLDER.is_match(s),
        Value::Array(items) => items.iter().any(contains_placeholder),
        Value::Object(map) => map.values().any(contains_placeholder),
        _ => false,
    }
}

impl AsRef<Map<String, Value>> for Environment {
    fn as_ref(&self) -> &Map<String, Value> {
        &self.values
    }
}
