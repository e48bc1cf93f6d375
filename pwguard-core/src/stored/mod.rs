//! Stored-password validation.
//!
//! [`StoredPasswordValidator`] looks up one row by primary key (single or
//! compound) and verifies a candidate password against the hash stored in
//! that row. Each call performs exactly one read; nothing fetched is cached
//! between calls. Only the compiled SQL is reused.
//!
//! # Outcomes
//! - `Ok(true)`: the row exists and the hash verifies
//! - `Ok(false)`: no row, no usable hash, or the hash does not verify
//! - `Err(_)`: the password could not be checked (see [`ValidatorError`])

use crate::{
    Result,
    adapters::DatabaseConnection,
    error::ValidatorError,
    query::{CompiledSelect, SelectQuery, SqlDialect},
    security::verify_password_hash_blocking,
};
use serde_json::Value as JsonValue;
use std::{
    borrow::Cow,
    sync::{Arc, OnceLock},
};

mod options;

pub use options::{
    CredentialLookupSpec, KeyColumns, KeyValues, LookupSource, StoredPasswordOptions,
};

/// Registry identifier of the stored-password validator.
pub const IDENTIFIER: &str = "stored_password";

/// Message reported when a candidate does not verify.
pub const INVALID_PASSWORD_MESSAGE: &str = "The supplied password is not valid.";

/// Rows fetched per lookup. Two is enough to detect a non-unique key.
pub const LOOKUP_ROW_LIMIT: u32 = 2;

/// Components that accept an injected database connection.
pub trait HasConnection {
    /// Connection currently in use, if any.
    fn connection(&self) -> Option<&Arc<dyn DatabaseConnection>>;

    /// Replaces the connection.
    fn set_connection(&mut self, connection: Arc<dyn DatabaseConnection>);

    /// True once a connection has been supplied.
    fn has_connection(&self) -> bool {
        self.connection().is_some()
    }
}

/// Verifies candidate passwords against a hash stored in a database row.
///
/// # Example
/// ```rust,no_run
/// use pwguard_core::adapters::create_connection;
/// use pwguard_core::stored::{StoredPasswordOptions, StoredPasswordValidator};
///
/// # async fn example() -> pwguard_core::Result<()> {
/// let connection = create_connection("sqlite:///var/lib/app/users.db").await?;
/// let validator = StoredPasswordValidator::new(
///     StoredPasswordOptions::new()
///         .table("users")
///         .password_column("password_hash")
///         .pk_column("id")
///         .pk_value(42),
/// )?
/// .with_connection(connection);
///
/// if validator.validate("correct horse battery staple").await? {
///     println!("password accepted");
/// }
/// # Ok(())
/// # }
/// ```
pub struct StoredPasswordValidator {
    source: LookupSource,
    connection: Option<Arc<dyn DatabaseConnection>>,
    compiled: OnceLock<CompiledSelect>,
}

impl std::fmt::Debug for StoredPasswordValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredPasswordValidator")
            .field("source", &self.source)
            .field("has_connection", &self.connection.is_some())
            .finish_non_exhaustive()
    }
}

impl StoredPasswordValidator {
    /// Creates a validator from raw options.
    ///
    /// # Errors
    /// Returns the first missing option (password column, key column, key
    /// value, then table), a key arity mismatch, or another configuration
    /// error. No partially built validator is ever returned.
    pub fn new(options: StoredPasswordOptions) -> Result<Self> {
        let source = LookupSource::try_from(options)?;
        Self::from_source(source)
    }

    /// Creates a validator from a precomposed lookup.
    ///
    /// # Errors
    /// Returns a configuration error if the lookup cannot be compiled, e.g.
    /// it has no predicate.
    pub fn from_query(query: SelectQuery) -> Result<Self> {
        Self::from_source(LookupSource::Query(query))
    }

    fn from_source(source: LookupSource) -> Result<Self> {
        // Surface unusable lookups at construction, not on first use
        source
            .to_query()
            .compile(SqlDialect::Sqlite, LOOKUP_ROW_LIMIT)?;

        Ok(Self {
            source,
            connection: None,
            compiled: OnceLock::new(),
        })
    }

    /// Builder method to supply the connection.
    pub fn with_connection(mut self, connection: Arc<dyn DatabaseConnection>) -> Self {
        self.set_connection(connection);
        self
    }

    /// Where the lookup comes from.
    pub fn source(&self) -> &LookupSource {
        &self.source
    }

    /// Lookup compiled for `dialect`, compiled once and then reused.
    fn compiled_for(&self, dialect: SqlDialect) -> Result<Cow<'_, CompiledSelect>> {
        if let Some(cached) = self.compiled.get() {
            if cached.dialect == dialect {
                return Ok(Cow::Borrowed(cached));
            }
            return self.compile(dialect).map(Cow::Owned);
        }

        let compiled = self.compile(dialect)?;
        Ok(Cow::Borrowed(self.compiled.get_or_init(|| compiled)))
    }

    fn compile(&self, dialect: SqlDialect) -> Result<CompiledSelect> {
        self.source.to_query().compile(dialect, LOOKUP_ROW_LIMIT)
    }

    /// Checks a candidate password against the stored hash.
    ///
    /// # Errors
    /// - [`ValidatorError::NoConnection`] before a connection is supplied
    /// - [`ValidatorError::AmbiguousMatch`] if the key matches several rows
    /// - Connection, query, timeout and verification failures
    pub async fn validate(&self, candidate: &str) -> Result<bool> {
        let connection = self
            .connection
            .as_ref()
            .ok_or(ValidatorError::NoConnection)?;
        let query = self.compiled_for(connection.dialect())?;

        let rows = connection.fetch_rows(&query).await?;
        let row = match rows.as_slice() {
            [] => {
                tracing::debug!(table = %query.table, "no credential row matched");
                return Ok(false);
            }
            [row] => row,
            _ => {
                tracing::warn!(table = %query.table, "credential key is not unique");
                return Err(ValidatorError::AmbiguousMatch {
                    table: query.table.clone(),
                });
            }
        };

        let stored = match row.get(&query.password_column) {
            Some(JsonValue::String(stored)) => stored,
            Some(JsonValue::Null) => {
                tracing::debug!(table = %query.table, "stored password is NULL");
                return Ok(false);
            }
            Some(_) => {
                tracing::warn!(table = %query.table, "stored password is not text");
                return Ok(false);
            }
            None => {
                tracing::warn!(
                    table = %query.table,
                    column = %query.password_column,
                    "password column missing from lookup result"
                );
                return Ok(false);
            }
        };

        let verified = verify_password_hash_blocking(candidate, stored).await?;
        tracing::debug!(table = %query.table, verified, "stored password checked");
        Ok(verified)
    }
}

impl HasConnection for StoredPasswordValidator {
    fn connection(&self) -> Option<&Arc<dyn DatabaseConnection>> {
        self.connection.as_ref()
    }

    fn set_connection(&mut self, connection: Arc<dyn DatabaseConnection>) {
        self.connection = Some(connection);
        self.compiled = OnceLock::new();
    }
}
