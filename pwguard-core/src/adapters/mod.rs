//! Credential-store connections.
//!
//! The stored-password validator talks to its database only through the
//! [`DatabaseConnection`] trait: report the SQL dialect, then run one
//! compiled lookup and hand back the matching rows as column-name -> value
//! mappings. The sqlx-backed implementations live in the engine modules.
//!
//! # Module Structure
//! - `config`: Connection settings (timeouts, pool size, read-only mode)
//! - Engine modules (`sqlite`, `postgres`, `mysql`), each feature-gated

use crate::{
    Result,
    error::ValidatorError,
    query::{CompiledSelect, SqlDialect},
};
use async_trait::async_trait;
use std::sync::Arc;

mod config;

pub use config::ConnectionConfig;

/// One fetched row: column name -> JSON-compatible value.
pub type StoredRow = serde_json::Map<String, serde_json::Value>;

/// A live handle to the database holding stored password hashes.
///
/// Implementations must bound every fetch by their own timeout and report
/// timeouts, cancellation and driver failures as errors; they never retry.
/// A handle may be shared by many validators.
#[async_trait]
pub trait DatabaseConnection: Send + Sync {
    /// SQL dialect lookups must be compiled for.
    fn dialect(&self) -> SqlDialect;

    /// Executes a compiled lookup and returns every row it produced.
    ///
    /// The row count is bounded by the LIMIT compiled into the query.
    async fn fetch_rows(&self, query: &CompiledSelect) -> Result<Vec<StoredRow>>;
}

/// Opens a connection, detecting the engine from the URL.
///
/// # Errors
/// Returns error if the URL format is unrecognised, the engine support is
/// not compiled in, or the database cannot be opened.
pub async fn create_connection(database_url: &str) -> Result<Arc<dyn DatabaseConnection>> {
    let dialect = detect_dialect(database_url)?;
    tracing::debug!(
        url = %crate::error::redact_database_url(database_url),
        ?dialect,
        "opening credential store"
    );

    match dialect {
        #[cfg(feature = "sqlite")]
        SqlDialect::Sqlite => Ok(Arc::new(sqlite::SqliteConnection::connect(database_url).await?)),
        #[cfg(not(feature = "sqlite"))]
        SqlDialect::Sqlite => Err(ValidatorError::configuration(
            "SQLite support not compiled in. Use --features sqlite",
        )),
        #[cfg(feature = "postgresql")]
        SqlDialect::Postgres => Ok(Arc::new(
            postgres::PostgresConnection::connect(database_url).await?,
        )),
        #[cfg(not(feature = "postgresql"))]
        SqlDialect::Postgres => Err(ValidatorError::configuration(
            "PostgreSQL support not compiled in. Use --features postgresql",
        )),
        #[cfg(feature = "mysql")]
        SqlDialect::MySql => Ok(Arc::new(mysql::MySqlConnection::connect(database_url).await?)),
        #[cfg(not(feature = "mysql"))]
        SqlDialect::MySql => Err(ValidatorError::configuration(
            "MySQL support not compiled in. Use --features mysql",
        )),
    }
}

/// Detects the SQL dialect from a connection string.
///
/// # Errors
/// Returns error if connection string format is unrecognized
pub fn detect_dialect(database_url: &str) -> Result<SqlDialect> {
    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok(SqlDialect::Postgres)
    } else if database_url.starts_with("mysql://") {
        Ok(SqlDialect::MySql)
    } else if database_url.starts_with("sqlite:")
        || database_url == ":memory:"
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url.ends_with(".sqlite3")
    {
        Ok(SqlDialect::Sqlite)
    } else {
        Err(ValidatorError::configuration(
            "Unrecognized database connection string format",
        ))
    }
}

/// Runs a driver future under the configured lookup timeout.
pub(crate) async fn with_timeout<T, F>(
    config: &ConnectionConfig,
    table: &str,
    fut: F,
) -> Result<T>
where
    F: std::future::Future<Output = std::result::Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(config.query_timeout, fut).await {
        Ok(result) => result.map_err(|e| {
            ValidatorError::from_sqlx(format!("Failed to look up credentials in '{}'", table), e)
        }),
        Err(_) => {
            tracing::warn!(table, timeout = ?config.query_timeout, "credential lookup timed out");
            Err(ValidatorError::QueryTimeout {
                timeout: config.query_timeout,
            })
        }
    }
}

/// Decodes binary column data, keeping it only when it is valid UTF-8.
pub(crate) fn bytes_to_value(bytes: Vec<u8>) -> serde_json::Value {
    String::from_utf8(bytes)
        .map(serde_json::Value::String)
        .unwrap_or(serde_json::Value::Null)
}

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgresql")]
pub mod postgres;

#[cfg(feature = "mysql")]
pub mod mysql;
