//! Password validators for pwguard.
//!
//! This crate provides two validators and the plumbing to build them from
//! application settings:
//! - [`PasswordComplexityValidator`]: minimum counts of length, uppercase,
//!   lowercase, digit and special characters
//! - [`StoredPasswordValidator`]: verifies a candidate against a password
//!   hash stored in a database row located by primary key
//!
//! # Security Guarantees
//! - Candidate passwords, stored hashes and database credentials are never
//!   logged or included in errors
//! - Key values are always bound, never interpolated into SQL
//! - Stored hashes are verified with constant-time comparisons off the
//!   async executor
//! - Credential stores are opened read-only
//!
//! # Architecture
//! - Validators are built from explicit options, or by identifier through
//!   [`ValidatorRegistry`]
//! - Database access goes through the [`DatabaseConnection`] trait, with
//!   sqlx-backed engines selected by feature
//! - A wrong password is `Ok(false)`; an error means it could not be checked

pub mod adapters;
pub mod complexity;
pub mod config;
pub mod error;
pub mod logging;
pub mod query;
pub mod registry;
pub mod security;
pub mod stored;

// Re-export commonly used types
pub use adapters::{ConnectionConfig, DatabaseConnection, StoredRow, create_connection};
pub use complexity::{ComplexityOptions, ComplexityResult, PasswordComplexityValidator, RuleKind};
pub use config::SettingsTree;
pub use error::{RequiredOption, Result, ValidatorError};
pub use query::{KeyValue, SelectQuery, SqlDialect, TableIdentifier};
pub use registry::{ValidationOutcome, Validator, ValidatorRegistry};
pub use stored::{HasConnection, StoredPasswordOptions, StoredPasswordValidator};
