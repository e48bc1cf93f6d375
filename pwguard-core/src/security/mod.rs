//! Security utilities for stored-password verification.
//!
//! # Security Guarantees
//! - Stored hashes are verified with the hashing scheme's own verifier,
//!   never by comparing candidate and stored strings
//! - Candidate passwords handed to background tasks live in `Zeroizing`
//!   buffers and are cleared when the task finishes
//! - Neither the candidate nor the stored hash is ever logged
//!
//! # Module Structure
//! - `hash`: Argon2 and bcrypt hash recognition and verification

mod hash;

pub use hash::{HashScheme, verify_password_hash, verify_password_hash_blocking};
