//! Stored hash verification.
//!
//! Stored values are opaque strings produced by a slow password hashing
//! function. Two families are recognised by their prefix:
//!
//! | Prefix | Scheme |
//! |--------|--------|
//! | `$argon2id$`, `$argon2i$`, `$argon2d$` | Argon2 (PHC string format) |
//! | `$2y$`, `$2b$`, `$2a$`, `$2x$` | bcrypt |
//!
//! Anything else, including a malformed hash of a recognised scheme,
//! verifies as `false`.

use crate::{Result, error::ValidatorError};
use argon2::Argon2;
use password_hash::{PasswordHash, PasswordVerifier};
use zeroize::Zeroizing;

/// Hashing scheme a stored value was produced with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashScheme {
    /// Argon2 in PHC string format
    Argon2,
    /// bcrypt modular crypt format
    Bcrypt,
}

impl HashScheme {
    /// Recognises the scheme of a stored hash from its prefix.
    pub fn detect(stored: &str) -> Option<Self> {
        const ARGON2_PREFIXES: [&str; 3] = ["$argon2id$", "$argon2i$", "$argon2d$"];
        const BCRYPT_PREFIXES: [&str; 4] = ["$2y$", "$2b$", "$2a$", "$2x$"];

        if ARGON2_PREFIXES.iter().any(|p| stored.starts_with(p)) {
            Some(Self::Argon2)
        } else if BCRYPT_PREFIXES.iter().any(|p| stored.starts_with(p)) {
            Some(Self::Bcrypt)
        } else {
            None
        }
    }
}

/// Verifies a candidate password against a stored hash.
///
/// This is CPU-bound by design of the hashing schemes; async callers should
/// use [`verify_password_hash_blocking`].
pub fn verify_password_hash(candidate: &str, stored: &str) -> bool {
    match HashScheme::detect(stored) {
        Some(HashScheme::Argon2) => match PasswordHash::new(stored) {
            Ok(parsed) => Argon2::default()
                .verify_password(candidate.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "stored Argon2 hash is malformed");
                false
            }
        },
        Some(HashScheme::Bcrypt) => match bcrypt::verify(candidate, stored) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!(error = %e, "stored bcrypt hash is malformed");
                false
            }
        },
        None => {
            tracing::warn!("stored password value is not a recognised hash format");
            false
        }
    }
}

/// Runs [`verify_password_hash`] on tokio's blocking pool.
///
/// # Errors
/// Returns [`ValidatorError::Verification`] if the blocking task panicked
/// or was cancelled.
pub async fn verify_password_hash_blocking(candidate: &str, stored: &str) -> Result<bool> {
    let candidate = Zeroizing::new(candidate.to_string());
    let stored = Zeroizing::new(stored.to_string());

    tokio::task::spawn_blocking(move || verify_password_hash(&candidate, &stored))
        .await
        .map_err(|e| ValidatorError::Verification {
            context: format!("hash verification task did not complete: {}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::{Algorithm, Params, Version};
    use password_hash::{PasswordHasher, SaltString};

    fn argon2_hash(password: &str, algorithm: Algorithm) -> String {
        let salt = SaltString::encode_b64(b"fixed-test-salt!").unwrap();
        let params = Params::new(1024, 1, 1, None).unwrap();
        Argon2::new(algorithm, Version::V0x13, params)
            .hash_password(password.as_bytes(), &salt)
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_detect_scheme() {
        assert_eq!(
            HashScheme::detect("$argon2id$v=19$m=1024,t=1,p=1$abc$def"),
            Some(HashScheme::Argon2)
        );
        assert_eq!(
            HashScheme::detect("$2y$10$abcdefghijklmnopqrstuv"),
            Some(HashScheme::Bcrypt)
        );
        assert_eq!(HashScheme::detect("$6$rounds=5000$salt$hash"), None);
        assert_eq!(HashScheme::detect("secret"), None);
    }

    #[test]
    fn test_argon2id_hash_verification() {
        let stored = argon2_hash("secret", Algorithm::Argon2id);
        assert!(verify_password_hash("secret", &stored));
        assert!(!verify_password_hash("wrong", &stored));
    }

    #[test]
    fn test_argon2i_hash_verification() {
        let stored = argon2_hash("secret", Algorithm::Argon2i);
        assert!(stored.starts_with("$argon2i$"));
        assert!(verify_password_hash("secret", &stored));
    }

    #[test]
    fn test_bcrypt_hash_verification() {
        let stored = bcrypt::hash("secret", 4).unwrap();
        assert!(verify_password_hash("secret", &stored));
        assert!(!verify_password_hash("Secret", &stored));
    }

    #[test]
    fn test_bcrypt_2y_prefix_verification() {
        let stored = bcrypt::hash_with_result("secret", 4)
            .unwrap()
            .format_for_version(bcrypt::Version::TwoY);
        assert!(stored.starts_with("$2y$"));
        assert!(verify_password_hash("secret", &stored));
    }

    #[test]
    fn test_plaintext_is_never_accepted() {
        // A plain equality compare would accept this
        assert!(!verify_password_hash("secret", "secret"));
        assert!(!verify_password_hash("", ""));
    }

    #[test]
    fn test_malformed_hashes_fail_closed() {
        assert!(!verify_password_hash("secret", "$argon2id$garbage"));
        assert!(!verify_password_hash("secret", "$2y$10$short"));
    }

    #[tokio::test]
    async fn test_blocking_hash_verification() {
        let stored = argon2_hash("secret", Algorithm::Argon2id);
        assert!(verify_password_hash_blocking("secret", &stored).await.unwrap());
        assert!(!verify_password_hash_blocking("wrong", &stored).await.unwrap());
    }
}
