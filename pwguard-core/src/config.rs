//! Application settings tree.
//!
//! Validator options can live in two places in the settings document:
//!
//! ```json
//! {
//!     "app_settings": {
//!         "password_complexity": { "length": 12, "upper": 1 }
//!     },
//!     "stored_password": { "table": "users", "password_column": "hash" }
//! }
//! ```
//!
//! The namespaced `app_settings.<identifier>` entry is preferred over a
//! top-level `<identifier>` entry. Call-site overrides are merged on top.

use crate::{Result, error::ValidatorError};
use serde_json::{Map, Value};
use std::path::Path;

/// Key of the namespace preferred for validator options.
pub const APP_SETTINGS_KEY: &str = "app_settings";

/// Parsed settings document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsTree {
    root: Value,
}

impl SettingsTree {
    /// Wraps an in-memory settings document.
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    /// Loads a JSON settings file.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be read and a serialization
    /// error if it is not valid JSON.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ValidatorError::Io {
                context: format!("Failed to read settings file '{}'", path.display()),
                source: e,
            })?;

        let root = serde_json::from_str(&contents).map_err(|e| ValidatorError::Serialization {
            context: format!("Failed to parse settings file '{}'", path.display()),
            source: e,
        })?;

        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(Self { root })
    }

    /// Underlying document.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Options stored for the validator registered as `identifier`, before
    /// any overrides. An empty object when nothing usable is configured.
    pub fn settings(&self, identifier: &str) -> Value {
        let namespaced = self
            .root
            .get(APP_SETTINGS_KEY)
            .and_then(|settings| settings.get(identifier))
            .filter(|v| !is_empty(v));
        let top_level = self.root.get(identifier).filter(|v| !is_empty(v));

        match (namespaced, top_level) {
            (Some(options), _) => {
                tracing::trace!(identifier, "using namespaced validator settings");
                options.clone()
            }
            (None, Some(options)) => {
                tracing::trace!(identifier, "using top-level validator settings");
                options.clone()
            }
            (None, None) => Value::Object(Map::new()),
        }
    }

    /// Options for the validator registered as `identifier`, with
    /// `overrides` merged on top.
    pub fn resolve(&self, identifier: &str, overrides: &Value) -> Value {
        merge(self.settings(identifier), overrides)
    }
}

/// Recursively merges `overrides` into `base`.
///
/// Objects merge key by key with `overrides` winning; any other value in
/// `overrides` (arrays included) replaces the base value. A `null` or
/// empty-object override leaves the base untouched.
pub fn merge(base: Value, overrides: &Value) -> Value {
    match (base, overrides) {
        (Value::Object(mut base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                let merged = match base.remove(key) {
                    Some(existing) => merge(existing, value),
                    None => value.clone(),
                };
                base.insert(key.clone(), merged);
            }
            Value::Object(base)
        }
        (base, Value::Null) => base,
        (base, Value::Object(overrides)) if overrides.is_empty() => base,
        (_, overrides) => overrides.clone(),
    }
}

/// Values that count as "not configured": null, false, zero, `"0"` and
/// empty strings, arrays and objects.
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(true) => false,
    }
}
