//! Credential lookup queries.
//!
//! A [`SelectQuery`] describes the single statement a stored-password lookup
//! needs: a bounded column projection from one table, filtered by equality
//! predicates joined with `AND`. It is compiled once per dialect into a
//! [`CompiledSelect`] holding parameterized SQL and its ordered binds.
//! Values are always bound, never interpolated; identifiers are quoted with
//! embedded quote characters doubled.

use crate::{Result, error::ValidatorError};
use serde::{Deserialize, Serialize};

/// Scalar value of a primary key column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyValue {
    /// Integer key
    Integer(i64),
    /// Textual key
    Text(String),
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for KeyValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl std::fmt::Display for KeyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// Table name with an optional schema qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableIdentifier {
    /// Unqualified table name
    pub name: String,
    /// Schema (or database, on MySQL) the table lives in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

impl TableIdentifier {
    /// Creates an unqualified table identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
        }
    }

    /// Builder method to set the schema.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    fn render(&self, dialect: SqlDialect) -> String {
        match &self.schema {
            Some(schema) => format!(
                "{}.{}",
                dialect.quote_identifier(schema),
                dialect.quote_identifier(&self.name)
            ),
            None => dialect.quote_identifier(&self.name),
        }
    }
}

impl std::fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// SQL flavour spoken by a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlDialect {
    /// SQLite: `"ident"`, `?` placeholders
    Sqlite,
    /// PostgreSQL: `"ident"`, `$n` placeholders
    Postgres,
    /// MySQL: `` `ident` ``, `?` placeholders
    MySql,
}

impl SqlDialect {
    /// Quotes an identifier, doubling embedded quote characters.
    pub fn quote_identifier(self, identifier: &str) -> String {
        match self {
            Self::Sqlite | Self::Postgres => format!("\"{}\"", identifier.replace('"', "\"\"")),
            Self::MySql => format!("`{}`", identifier.replace('`', "``")),
        }
    }

    /// Bind placeholder for the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Self::Postgres => format!("${}", index),
            Self::Sqlite | Self::MySql => "?".to_string(),
        }
    }
}

/// Equality predicate `column = value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    /// Filtered column
    pub column: String,
    /// Value the column must equal
    pub value: KeyValue,
}

/// Dialect-independent description of a credential lookup.
///
/// Can be supplied directly to a stored-password validator in place of
/// table/column/key options.
///
/// ```rust
/// use pwguard_core::query::{SelectQuery, SqlDialect, TableIdentifier};
///
/// let query = SelectQuery::new(TableIdentifier::new("users"), "password_hash")
///     .column("id")
///     .filter_eq("id", 42);
///
/// let compiled = query.compile(SqlDialect::Postgres, 2).unwrap();
/// assert_eq!(
///     compiled.sql,
///     r#"SELECT "id", "password_hash" FROM "users" WHERE "id" = $1 LIMIT 2"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectQuery {
    /// Source table
    pub table: TableIdentifier,
    /// Projected columns besides the password column
    #[serde(default)]
    pub columns: Vec<String>,
    /// Column holding the stored hash
    pub password_column: String,
    /// Equality predicates, joined with AND in order
    #[serde(default)]
    pub filters: Vec<Predicate>,
}

impl SelectQuery {
    /// Creates a query projecting only the password column.
    pub fn new(table: TableIdentifier, password_column: impl Into<String>) -> Self {
        Self {
            table,
            columns: Vec::new(),
            password_column: password_column.into(),
            filters: Vec::new(),
        }
    }

    /// Adds a projected column.
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self
    }

    /// Adds an equality predicate.
    pub fn filter_eq(mut self, column: impl Into<String>, value: impl Into<KeyValue>) -> Self {
        self.filters.push(Predicate {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    /// Compiles the query for a dialect, limiting the result to `row_limit`
    /// rows.
    ///
    /// # Errors
    /// Returns a configuration error if any identifier is empty or the query
    /// has no predicate.
    pub fn compile(&self, dialect: SqlDialect, row_limit: u32) -> Result<CompiledSelect> {
        if self.table.name.is_empty() {
            return Err(ValidatorError::configuration("table name cannot be empty"));
        }
        if self.table.schema.as_deref() == Some("") {
            return Err(ValidatorError::configuration("schema name cannot be empty"));
        }
        if self.password_column.is_empty() {
            return Err(ValidatorError::configuration(
                "password column cannot be empty",
            ));
        }
        if self.filters.is_empty() {
            return Err(ValidatorError::configuration(
                "credential lookup requires at least one key predicate",
            ));
        }
        if self.columns.iter().any(String::is_empty)
            || self.filters.iter().any(|p| p.column.is_empty())
        {
            return Err(ValidatorError::configuration("column names cannot be empty"));
        }

        let mut projection: Vec<&str> = Vec::with_capacity(self.columns.len() + 1);
        for column in self
            .columns
            .iter()
            .chain(std::iter::once(&self.password_column))
        {
            if !projection.contains(&column.as_str()) {
                projection.push(column);
            }
        }

        let select_list = projection
            .iter()
            .map(|c| dialect.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");

        let predicates = self
            .filters
            .iter()
            .enumerate()
            .map(|(i, p)| {
                format!(
                    "{} = {}",
                    dialect.quote_identifier(&p.column),
                    dialect.placeholder(i + 1)
                )
            })
            .collect::<Vec<_>>()
            .join(" AND ");

        let sql = format!(
            "SELECT {} FROM {} WHERE {} LIMIT {}",
            select_list,
            self.table.render(dialect),
            predicates,
            row_limit
        );

        tracing::debug!(table = %self.table, ?dialect, "compiled credential lookup");

        Ok(CompiledSelect {
            sql,
            binds: self.filters.iter().map(|p| p.value.clone()).collect(),
            password_column: self.password_column.clone(),
            table: self.table.to_string(),
            dialect,
        })
    }
}

/// A lookup ready to execute on a connection of one dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledSelect {
    /// Parameterized SQL text
    pub sql: String,
    /// Bind values in placeholder order
    pub binds: Vec<KeyValue>,
    /// Column of the result holding the stored hash
    pub password_column: String,
    /// Display name of the source table, for diagnostics
    pub table: String,
    /// Dialect the SQL was rendered for
    pub dialect: SqlDialect,
}
