//! Validator construction by identifier.
//!
//! A [`ValidatorRegistry`] maps stable identifiers to constructor functions.
//! Building a validator resolves its options from a [`SettingsTree`], merges
//! call-site overrides, and hands the shared database connection to any
//! validator that accepts one.
//!
//! ```rust
//! use pwguard_core::config::SettingsTree;
//! use pwguard_core::registry::ValidatorRegistry;
//! use serde_json::json;
//!
//! # async fn example() -> pwguard_core::Result<()> {
//! let registry = ValidatorRegistry::with_defaults();
//! let tree = SettingsTree::from_value(json!({
//!     "app_settings": { "password_complexity": { "length": 8, "digit": 1 } }
//! }));
//!
//! let validator = registry.build("password_complexity", &tree, &json!({}), None)?;
//! assert!(validator.is_valid("hunter42x").await?);
//! # Ok(())
//! # }
//! ```

use crate::{
    Result,
    adapters::DatabaseConnection,
    complexity::{self, ComplexityOptions, PasswordComplexityValidator},
    config::{SettingsTree, merge},
    error::ValidatorError,
    stored::{self, HasConnection, StoredPasswordOptions, StoredPasswordValidator},
};
use serde_json::Value;
use std::{collections::BTreeMap, sync::Arc};

/// Builds a validator from resolved options.
pub type Constructor = fn(&Value) -> Result<Validator>;

/// Rewrites stored settings into a shape overrides can merge into.
pub type Normalizer = fn(Value) -> Value;

#[derive(Debug, Clone, Copy)]
struct Registration {
    constructor: Constructor,
    normalize: Option<Normalizer>,
}

/// A validator built through the registry.
#[derive(Debug)]
pub enum Validator {
    /// Complexity rules
    Complexity(PasswordComplexityValidator),
    /// Stored-password lookup
    StoredPassword(StoredPasswordValidator),
}

/// Result of [`Validator::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// True iff the candidate passed
    pub valid: bool,
    messages: BTreeMap<String, String>,
}

impl ValidationOutcome {
    /// Failure messages keyed by failure kind; empty when valid.
    pub fn messages(&self) -> &BTreeMap<String, String> {
        &self.messages
    }
}

impl Validator {
    /// Identifier this kind of validator is registered under.
    pub const fn identifier(&self) -> &'static str {
        match self {
            Self::Complexity(_) => complexity::IDENTIFIER,
            Self::StoredPassword(_) => stored::IDENTIFIER,
        }
    }

    /// Validates a candidate and collects failure messages.
    ///
    /// # Errors
    /// Only stored-password validation can fail; see
    /// [`StoredPasswordValidator::validate`].
    pub async fn validate(&self, candidate: &str) -> Result<ValidationOutcome> {
        match self {
            Self::Complexity(validator) => {
                let result = validator.validate(candidate);
                Ok(ValidationOutcome {
                    valid: result.valid,
                    messages: result
                        .messages()
                        .into_iter()
                        .map(|(rule, message)| (rule.key().to_string(), message))
                        .collect(),
                })
            }
            Self::StoredPassword(validator) => {
                let valid = validator.validate(candidate).await?;
                let mut messages = BTreeMap::new();
                if !valid {
                    messages.insert(
                        "invalid_password".to_string(),
                        stored::INVALID_PASSWORD_MESSAGE.to_string(),
                    );
                }
                Ok(ValidationOutcome { valid, messages })
            }
        }
    }

    /// Shorthand for `validate(candidate).await?.valid`.
    ///
    /// # Errors
    /// See [`Validator::validate`].
    pub async fn is_valid(&self, candidate: &str) -> Result<bool> {
        Ok(self.validate(candidate).await?.valid)
    }

    /// Connection capability, for validators that have one.
    pub fn as_has_connection_mut(&mut self) -> Option<&mut dyn HasConnection> {
        match self {
            Self::Complexity(_) => None,
            Self::StoredPassword(validator) => Some(validator as &mut dyn HasConnection),
        }
    }
}

/// Identifier -> constructor table, populated at startup.
#[derive(Debug, Clone, Default)]
pub struct ValidatorRegistry {
    registrations: BTreeMap<String, Registration>,
}

impl ValidatorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with both built-in validators.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_normalized(
            complexity::IDENTIFIER,
            build_complexity,
            complexity::expand_length_shorthand,
        );
        registry.register(stored::IDENTIFIER, build_stored_password);
        registry
    }

    /// Registers (or replaces) a constructor.
    pub fn register(&mut self, identifier: impl Into<String>, constructor: Constructor) {
        self.registrations.insert(
            identifier.into(),
            Registration {
                constructor,
                normalize: None,
            },
        );
    }

    /// Registers a constructor whose stored settings pass through
    /// `normalize` before overrides are merged.
    pub fn register_normalized(
        &mut self,
        identifier: impl Into<String>,
        constructor: Constructor,
        normalize: Normalizer,
    ) {
        self.registrations.insert(
            identifier.into(),
            Registration {
                constructor,
                normalize: Some(normalize),
            },
        );
    }

    /// True if `identifier` is registered.
    pub fn contains(&self, identifier: &str) -> bool {
        self.registrations.contains_key(identifier)
    }

    /// Registered identifiers, sorted.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.registrations.keys().map(String::as_str)
    }

    /// Builds the validator registered as `identifier`.
    ///
    /// Options are the stored settings for `identifier`, normalized if the
    /// registration asks for it, with `overrides` merged on top. The
    /// connection, if
    /// given, is injected into validators that accept one and ignored by the
    /// rest.
    ///
    /// # Errors
    /// Returns a configuration error for an unknown identifier or options
    /// the validator rejects.
    pub fn build(
        &self,
        identifier: &str,
        tree: &SettingsTree,
        overrides: &Value,
        connection: Option<Arc<dyn DatabaseConnection>>,
    ) -> Result<Validator> {
        let registration = self.registrations.get(identifier).ok_or_else(|| {
            ValidatorError::configuration(format!("Unknown validator '{}'", identifier))
        })?;

        let mut settings = tree.settings(identifier);
        if let Some(normalize) = registration.normalize {
            settings = normalize(settings);
        }
        let options = merge(settings, overrides);
        let mut validator = (registration.constructor)(&options)?;

        if let Some(connection) = connection
            && let Some(target) = validator.as_has_connection_mut()
        {
            target.set_connection(connection);
        }

        tracing::debug!(identifier, "built validator");
        Ok(validator)
    }
}

fn options_from<T: serde::de::DeserializeOwned>(identifier: &str, options: &Value) -> Result<T> {
    serde_json::from_value(options.clone()).map_err(|e| {
        ValidatorError::configuration(format!("Invalid options for '{}': {}", identifier, e))
    })
}

fn build_complexity(options: &Value) -> Result<Validator> {
    let options: ComplexityOptions = options_from(complexity::IDENTIFIER, options)?;
    Ok(Validator::Complexity(PasswordComplexityValidator::new(
        options,
    )))
}

fn build_stored_password(options: &Value) -> Result<Validator> {
    let options: StoredPasswordOptions = options_from(stored::IDENTIFIER, options)?;
    StoredPasswordValidator::new(options).map(Validator::StoredPassword)
}
