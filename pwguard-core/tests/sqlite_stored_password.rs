//! Stored-password validation against a real SQLite database.
//!
//! This test suite covers:
//! - Argon2 and bcrypt hashes stored as TEXT and BLOB
//! - Missing rows, NULL and plaintext password values
//! - Compound keys and schema-qualified tables
//! - Non-unique keys
//! - Precomposed lookups and identifier quoting
//! - Building through the registry with an injected connection

#![cfg(feature = "sqlite")]

use argon2::{Algorithm, Argon2, Params, Version};
use password_hash::{PasswordHasher, SaltString};
use pwguard_core::{
    ConnectionConfig, DatabaseConnection, KeyValue, Result, SelectQuery, SettingsTree,
    StoredPasswordOptions, StoredPasswordValidator, TableIdentifier, ValidatorError,
    ValidatorRegistry, adapters::sqlite::SqliteConnection, stored::KeyValues,
};
use serde_json::json;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::sync::Arc;

fn argon2_hash(password: &str) -> String {
    let salt = SaltString::encode_b64(b"integration-salt").unwrap();
    let params = Params::new(1024, 1, 1, None).unwrap();
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string()
}

fn bcrypt_2y_hash(password: &str) -> String {
    bcrypt::hash_with_result(password, 4)
        .unwrap()
        .format_for_version(bcrypt::Version::TwoY)
}

/// Single-connection pool so every query sees the same in-memory database
async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

/// Creates the `users` table with one row per stored-value shape
async fn users_connection() -> Arc<dyn DatabaseConnection> {
    let pool = memory_pool().await;

    sqlx::query("CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT, password_hash)")
        .execute(&pool)
        .await
        .unwrap();

    let rows: [(i64, &str, Option<String>); 4] = [
        (1, "argon@example.com", Some(argon2_hash("correct horse"))),
        (2, "bcrypt@example.com", Some(bcrypt_2y_hash("battery staple"))),
        (3, "nohash@example.com", None),
        (4, "plain@example.com", Some("correct horse".to_string())),
    ];
    for (id, email, hash) in rows {
        sqlx::query("INSERT INTO users (id, email, password_hash) VALUES (?, ?, ?)")
            .bind(id)
            .bind(email)
            .bind(hash)
            .execute(&pool)
            .await
            .unwrap();
    }

    // Hash stored as a BLOB
    sqlx::query("INSERT INTO users (id, email, password_hash) VALUES (?, ?, ?)")
        .bind(5_i64)
        .bind("blob@example.com")
        .bind(bcrypt_2y_hash("blob secret").into_bytes())
        .execute(&pool)
        .await
        .unwrap();

    Arc::new(SqliteConnection::from_pool(pool, ConnectionConfig::default()))
}

fn user_validator(id: i64, connection: &Arc<dyn DatabaseConnection>) -> StoredPasswordValidator {
    StoredPasswordValidator::new(
        StoredPasswordOptions::new()
            .table("users")
            .password_column("password_hash")
            .pk_column("id")
            .pk_value(id),
    )
    .unwrap()
    .with_connection(Arc::clone(connection))
}

#[tokio::test]
async fn test_argon2_stored_password() -> Result<()> {
    let connection = users_connection().await;
    let validator = user_validator(1, &connection);

    assert!(validator.validate("correct horse").await?);
    assert!(!validator.validate("correct horse ").await?);
    assert!(!validator.validate("").await?);
    Ok(())
}

#[tokio::test]
async fn test_bcrypt_stored_password() -> Result<()> {
    let connection = users_connection().await;
    let validator = user_validator(2, &connection);

    assert!(validator.validate("battery staple").await?);
    assert!(!validator.validate("Battery staple").await?);
    Ok(())
}

#[tokio::test]
async fn test_blob_stored_password() -> Result<()> {
    let connection = users_connection().await;
    assert!(user_validator(5, &connection).validate("blob secret").await?);
    Ok(())
}

#[tokio::test]
async fn test_unknown_row_is_invalid() -> Result<()> {
    let connection = users_connection().await;
    assert!(!user_validator(999, &connection).validate("correct horse").await?);
    Ok(())
}

#[tokio::test]
async fn test_null_and_plaintext_values_are_invalid() -> Result<()> {
    let connection = users_connection().await;
    assert!(!user_validator(3, &connection).validate("").await?);
    assert!(!user_validator(4, &connection).validate("correct horse").await?);
    Ok(())
}

#[tokio::test]
async fn test_text_key_lookup() -> Result<()> {
    let connection = users_connection().await;
    let validator = StoredPasswordValidator::new(
        StoredPasswordOptions::new()
            .table("users")
            .schema("main")
            .password_column("password_hash")
            .pk_column("email")
            .pk_value("bcrypt@example.com"),
    )?
    .with_connection(connection);

    assert!(validator.validate("battery staple").await?);
    Ok(())
}

#[tokio::test]
async fn test_compound_key_lookup() -> Result<()> {
    let pool = memory_pool().await;
    sqlx::query(
        "CREATE TABLE memberships (
            tenant_id INTEGER NOT NULL,
            login TEXT NOT NULL,
            secret TEXT NOT NULL,
            PRIMARY KEY (tenant_id, login)
        )",
    )
    .execute(&pool)
    .await
    .unwrap();

    for (tenant, password) in [(1_i64, "tenant one"), (2_i64, "tenant two")] {
        sqlx::query("INSERT INTO memberships (tenant_id, login, secret) VALUES (?, 'alice', ?)")
            .bind(tenant)
            .bind(bcrypt_2y_hash(password))
            .execute(&pool)
            .await
            .unwrap();
    }

    let connection: Arc<dyn DatabaseConnection> =
        Arc::new(SqliteConnection::from_pool(pool, ConnectionConfig::default()));
    let validator_for = |tenant: i64| {
        StoredPasswordValidator::new(
            StoredPasswordOptions::new()
                .table("memberships")
                .password_column("secret")
                .pk_column(vec!["tenant_id", "login"])
                .pk_value(KeyValues::compound([
                    KeyValue::from(tenant),
                    KeyValue::from("alice"),
                ])),
        )
        .unwrap()
        .with_connection(Arc::clone(&connection))
    };

    assert!(validator_for(1).validate("tenant one").await?);
    assert!(!validator_for(1).validate("tenant two").await?);
    assert!(validator_for(2).validate("tenant two").await?);
    assert!(!validator_for(3).validate("tenant one").await?);
    Ok(())
}

#[tokio::test]
async fn test_non_unique_key_is_ambiguous() -> Result<()> {
    let pool = memory_pool().await;
    sqlx::query("CREATE TABLE legacy_users (username TEXT, pw TEXT)")
        .execute(&pool)
        .await
        .unwrap();
    for _ in 0..2 {
        sqlx::query("INSERT INTO legacy_users (username, pw) VALUES ('bob', ?)")
            .bind(bcrypt_2y_hash("hunter2"))
            .execute(&pool)
            .await
            .unwrap();
    }

    let validator = StoredPasswordValidator::new(
        StoredPasswordOptions::new()
            .table("legacy_users")
            .password_column("pw")
            .pk_column("username")
            .pk_value("bob"),
    )?
    .with_connection(Arc::new(SqliteConnection::from_pool(
        pool,
        ConnectionConfig::default(),
    )));

    let error = validator.validate("hunter2").await.unwrap_err();
    assert!(
        matches!(error, ValidatorError::AmbiguousMatch { ref table } if table == "legacy_users"),
        "unexpected error: {}",
        error
    );
    Ok(())
}

#[tokio::test]
async fn test_precomposed_query_with_quoted_identifiers() -> Result<()> {
    let pool = memory_pool().await;
    sqlx::query(r#"CREATE TABLE "user accounts" ("select" TEXT PRIMARY KEY, "pass""word" TEXT)"#)
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(r#"INSERT INTO "user accounts" VALUES ('carol', ?)"#)
        .bind(argon2_hash("quoted"))
        .execute(&pool)
        .await
        .unwrap();

    let query = SelectQuery::new(TableIdentifier::new("user accounts"), "pass\"word")
        .filter_eq("select", "carol");
    let validator = StoredPasswordValidator::from_query(query)?.with_connection(Arc::new(
        SqliteConnection::from_pool(pool, ConnectionConfig::default()),
    ));

    assert!(validator.validate("quoted").await?);
    assert!(!validator.validate("unquoted").await?);
    Ok(())
}

#[tokio::test]
async fn test_missing_table_is_a_query_error() -> Result<()> {
    let connection: Arc<dyn DatabaseConnection> = Arc::new(SqliteConnection::from_pool(
        memory_pool().await,
        ConnectionConfig::default(),
    ));
    let validator = user_validator(1, &connection);

    let error = validator.validate("anything").await.unwrap_err();
    assert!(matches!(error, ValidatorError::QueryExecution { .. }));
    assert!(error.is_infrastructure());
    Ok(())
}

#[tokio::test]
async fn test_registry_builds_connected_validator() -> Result<()> {
    let connection = users_connection().await;
    let tree = SettingsTree::from_value(json!({
        "app_settings": {
            "stored_password": {
                "table": "users",
                "password_column": "password_hash",
                "pk_column": "id"
            }
        }
    }));

    let validator = ValidatorRegistry::with_defaults().build(
        "stored_password",
        &tree,
        &json!({ "pk_value": 2 }),
        Some(connection),
    )?;

    let outcome = validator.validate("wrong").await?;
    assert!(!outcome.valid);
    assert_eq!(
        outcome.messages().get("invalid_password").map(String::as_str),
        Some("The supplied password is not valid.")
    );
    assert!(validator.is_valid("battery staple").await?);
    Ok(())
}
