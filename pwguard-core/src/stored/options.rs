//! Stored-password validator options.
//!
//! [`StoredPasswordOptions`] is the raw, possibly incomplete option set as
//! it arrives from configuration or a builder. [`LookupSource::try_from`]
//! validates it once into either an immutable [`CredentialLookupSpec`] or a
//! precomposed [`SelectQuery`].

use crate::{
    Result,
    error::{RequiredOption, ValidatorError},
    query::{KeyValue, SelectQuery, TableIdentifier},
};
use serde::{Deserialize, Serialize};

/// Primary key column(s): one name or an ordered compound key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyColumns {
    /// Single-column key
    Single(String),
    /// Compound key, in predicate order
    Compound(Vec<String>),
}

impl From<&str> for KeyColumns {
    fn from(column: &str) -> Self {
        Self::Single(column.to_string())
    }
}

impl From<String> for KeyColumns {
    fn from(column: String) -> Self {
        Self::Single(column)
    }
}

impl<S: Into<String>> From<Vec<S>> for KeyColumns {
    fn from(columns: Vec<S>) -> Self {
        Self::Compound(columns.into_iter().map(Into::into).collect())
    }
}

/// Primary key value(s), matching [`KeyColumns`] in shape and order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyValues {
    /// Value of a single-column key
    Single(KeyValue),
    /// Values of a compound key
    Compound(Vec<KeyValue>),
}

impl From<KeyValue> for KeyValues {
    fn from(value: KeyValue) -> Self {
        Self::Single(value)
    }
}

impl From<i64> for KeyValues {
    fn from(value: i64) -> Self {
        Self::Single(value.into())
    }
}

impl From<i32> for KeyValues {
    fn from(value: i32) -> Self {
        Self::Single(value.into())
    }
}

impl From<&str> for KeyValues {
    fn from(value: &str) -> Self {
        Self::Single(value.into())
    }
}

impl From<String> for KeyValues {
    fn from(value: String) -> Self {
        Self::Single(value.into())
    }
}

impl KeyValues {
    /// Builds compound key values.
    pub fn compound<V: Into<KeyValue>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::Compound(values.into_iter().map(Into::into).collect())
    }
}

/// Raw stored-password options.
///
/// Either `query` is set, or `password_column`, `pk_column`, `pk_value` and
/// `table` (optionally qualified by `schema`) are.
///
/// # Example
/// ```rust
/// use pwguard_core::stored::{LookupSource, StoredPasswordOptions};
///
/// let options = StoredPasswordOptions::new()
///     .table("users")
///     .password_column("password_hash")
///     .pk_column("id")
///     .pk_value(42);
///
/// assert!(LookupSource::try_from(options).is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredPasswordOptions {
    /// Table holding the credentials
    pub table: Option<String>,
    /// Schema qualifying `table`
    pub schema: Option<String>,
    /// Column holding the stored hash
    pub password_column: Option<String>,
    /// Primary key column(s)
    pub pk_column: Option<KeyColumns>,
    /// Primary key value(s) of the row to check against
    pub pk_value: Option<KeyValues>,
    /// Precomposed lookup, replacing every other option
    pub query: Option<SelectQuery>,
}

impl StoredPasswordOptions {
    /// Creates an empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the table.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Builder method to set the schema.
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Builder method to set the password column.
    pub fn password_column(mut self, column: impl Into<String>) -> Self {
        self.password_column = Some(column.into());
        self
    }

    /// Builder method to set the primary key column(s).
    pub fn pk_column(mut self, columns: impl Into<KeyColumns>) -> Self {
        self.pk_column = Some(columns.into());
        self
    }

    /// Builder method to set the primary key value(s).
    pub fn pk_value(mut self, values: impl Into<KeyValues>) -> Self {
        self.pk_value = Some(values.into());
        self
    }

    /// Builder method to supply a precomposed lookup.
    pub fn query(mut self, query: SelectQuery) -> Self {
        self.query = Some(query);
        self
    }
}

/// Validated description of the row holding one stored password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialLookupSpec {
    table: TableIdentifier,
    password_column: String,
    key: Vec<(String, KeyValue)>,
}

impl CredentialLookupSpec {
    /// Pairs key columns with key values and validates the result.
    ///
    /// # Errors
    /// - [`ValidatorError::KeyArity`] when columns and values differ in shape
    ///   or length, or a compound key is empty
    /// - [`ValidatorError::Configuration`] when a name is empty
    pub fn new(
        table: TableIdentifier,
        password_column: impl Into<String>,
        columns: KeyColumns,
        values: KeyValues,
    ) -> Result<Self> {
        let password_column = password_column.into();

        let key: Vec<(String, KeyValue)> = match (columns, values) {
            (KeyColumns::Single(column), KeyValues::Single(value)) => vec![(column, value)],
            (KeyColumns::Compound(columns), KeyValues::Compound(values))
                if columns.len() == values.len() && !columns.is_empty() =>
            {
                columns.into_iter().zip(values).collect()
            }
            (columns, values) => {
                return Err(ValidatorError::KeyArity {
                    columns: match columns {
                        KeyColumns::Single(_) => 1,
                        KeyColumns::Compound(c) => c.len(),
                    },
                    values: match values {
                        KeyValues::Single(_) => 1,
                        KeyValues::Compound(v) => v.len(),
                    },
                });
            }
        };

        if table.name.is_empty() || table.schema.as_deref() == Some("") {
            return Err(ValidatorError::configuration(
                "table and schema names cannot be empty",
            ));
        }
        if password_column.is_empty() {
            return Err(ValidatorError::configuration(
                "password column cannot be empty",
            ));
        }
        if key.iter().any(|(column, _)| column.is_empty()) {
            return Err(ValidatorError::configuration(
                "primary key column names cannot be empty",
            ));
        }

        Ok(Self {
            table,
            password_column,
            key,
        })
    }

    /// Table the credentials live in.
    pub fn table(&self) -> &TableIdentifier {
        &self.table
    }

    /// Column holding the stored hash.
    pub fn password_column(&self) -> &str {
        &self.password_column
    }

    /// Key columns paired with their values, in predicate order.
    pub fn key(&self) -> &[(String, KeyValue)] {
        &self.key
    }

    /// Lookup projecting the key column(s) and the password column,
    /// filtered by every key pair.
    pub fn to_query(&self) -> SelectQuery {
        self.key.iter().fold(
            SelectQuery::new(self.table.clone(), self.password_column.clone()),
            |query, (column, value)| query.column(column.clone()).filter_eq(column.clone(), value.clone()),
        )
    }
}

/// Where a stored-password validator gets its lookup from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupSource {
    /// Built from table/column/key options
    Spec(CredentialLookupSpec),
    /// Supplied precomposed
    Query(SelectQuery),
}

impl LookupSource {
    /// The dialect-independent lookup.
    pub fn to_query(&self) -> SelectQuery {
        match self {
            Self::Spec(spec) => spec.to_query(),
            Self::Query(query) => query.clone(),
        }
    }
}

impl TryFrom<StoredPasswordOptions> for LookupSource {
    type Error = ValidatorError;

    /// Validates raw options. Missing options are reported one at a time in
    /// the order password column, key column, key value, table.
    fn try_from(options: StoredPasswordOptions) -> Result<Self> {
        if let Some(query) = options.query {
            return Ok(Self::Query(query));
        }

        let password_column = options
            .password_column
            .ok_or(ValidatorError::missing(RequiredOption::PasswordColumn))?;
        let columns = options
            .pk_column
            .ok_or(ValidatorError::missing(RequiredOption::PrimaryKeyColumn))?;
        let values = options
            .pk_value
            .ok_or(ValidatorError::missing(RequiredOption::PrimaryKeyValue))?;

        let table = match (options.table, options.schema) {
            (Some(table), schema) => TableIdentifier {
                name: table,
                schema,
            },
            (None, Some(_)) => {
                return Err(ValidatorError::configuration(
                    "a schema was given without a table to look up",
                ));
            }
            (None, None) => return Err(ValidatorError::missing(RequiredOption::TableOrSchema)),
        };

        CredentialLookupSpec::new(table, password_column, columns, values).map(Self::Spec)
    }
}
