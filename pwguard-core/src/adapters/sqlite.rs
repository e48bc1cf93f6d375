//! SQLite credential store.
//!
//! # Connection Modes
//! - File-based: `sqlite:///path/to/database.db` or a bare `*.db` path
//! - In-memory: `sqlite::memory:` or `:memory:`
//!
//! File-based databases are opened read-only. SQLite needs no pooling, so
//! the pool is capped at a single connection.

use super::{ConnectionConfig, DatabaseConnection, StoredRow, bytes_to_value, with_timeout};
use crate::{
    Result,
    error::ValidatorError,
    query::{CompiledSelect, KeyValue, SqlDialect},
};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::{Column, Row, SqlitePool, sqlite::SqliteRow};

/// SQLite-backed [`DatabaseConnection`].
pub struct SqliteConnection {
    pool: SqlitePool,
    config: ConnectionConfig,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SqliteConnection {
    /// Opens a SQLite database from a URL or file path.
    ///
    /// # Errors
    /// Returns error if the connection string is invalid or the database
    /// cannot be opened.
    pub async fn connect(connection_string: &str) -> Result<Self> {
        use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
        use std::str::FromStr;

        let normalized = normalize_connection_string(connection_string);
        let in_memory = normalized.contains(":memory:") || normalized.contains("mode=memory");

        let config = ConnectionConfig::default().with_max_connections(1);

        let mut options = SqliteConnectOptions::from_str(&normalized).map_err(|e| {
            ValidatorError::configuration(format!("Invalid SQLite connection string: {}", e))
        })?;
        if config.read_only && !in_memory {
            options = options.read_only(true);
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect_with(options)
            .await
            .map_err(|e| ValidatorError::connection_failed("Failed to open SQLite database", e))?;

        Ok(Self { pool, config })
    }

    /// Wraps an existing pool.
    pub fn from_pool(pool: SqlitePool, config: ConnectionConfig) -> Self {
        Self { pool, config }
    }

    /// Connection configuration in use.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Closes the pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl DatabaseConnection for SqliteConnection {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::Sqlite
    }

    async fn fetch_rows(&self, query: &CompiledSelect) -> Result<Vec<StoredRow>> {
        let mut statement = sqlx::query(&query.sql);
        for bind in &query.binds {
            statement = match bind {
                KeyValue::Integer(v) => statement.bind(*v),
                KeyValue::Text(v) => statement.bind(v.clone()),
            };
        }

        let rows = with_timeout(&self.config, &query.table, statement.fetch_all(&self.pool)).await?;
        Ok(rows.iter().map(row_to_map).collect())
    }
}

fn row_to_map(row: &SqliteRow) -> StoredRow {
    row.columns()
        .iter()
        .map(|column| {
            let name = column.name();
            (name.to_string(), extract_column_value(row, name))
        })
        .collect()
}

/// SQLite is dynamically typed, so each storage class is tried in turn.
fn extract_column_value(row: &SqliteRow, column_name: &str) -> JsonValue {
    if let Ok(v) = row.try_get::<Option<String>, _>(column_name) {
        return v.map(JsonValue::String).unwrap_or(JsonValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(column_name) {
        return v
            .map(|n| JsonValue::Number(n.into()))
            .unwrap_or(JsonValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(column_name) {
        return v
            .and_then(serde_json::Number::from_f64)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(column_name) {
        return v.map(bytes_to_value).unwrap_or(JsonValue::Null);
    }

    JsonValue::Null
}

fn normalize_connection_string(connection_string: &str) -> String {
    if connection_string == ":memory:" {
        return "sqlite::memory:".to_string();
    }

    if connection_string.starts_with("sqlite:") {
        return connection_string.to_string();
    }

    format!("sqlite://{}", connection_string)
}
