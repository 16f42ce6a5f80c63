//! Argon2id password hashing and verification.

use argon2::{
    password_hash::{
        rand_core::OsRng, Error as HashError, PasswordHash, PasswordHasher as _,
        PasswordVerifier as _, SaltString,
    },
    Argon2,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Outcome of comparing a password against a stored verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordCheck {
    Matched,
    Mismatched,
    /// The stored verifier is not a PHC string this hasher understands.
    Malformed,
}

/// Hash a plaintext password with a random salt.
///
/// The returned PHC string embeds algorithm, parameters and salt.
///
/// # Errors
/// Returns an error only if the random source or the hash primitive fails.
pub fn hash(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Compare `password` against `verifier` in constant time.
#[must_use]
pub fn verify(verifier: &str, password: &str) -> PasswordCheck {
    let Ok(parsed) = PasswordHash::new(verifier) else {
        return PasswordCheck::Malformed;
    };

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => PasswordCheck::Matched,
        Err(HashError::Password) => PasswordCheck::Mismatched,
        Err(_) => PasswordCheck::Malformed,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify_matches() {
        let verifier = hash("correct horse battery").unwrap();
        assert_eq!(verify(&verifier, "correct horse battery"), PasswordCheck::Matched);
    }

    #[test]
    fn test_other_password_mismatches() {
        let verifier = hash("correct horse battery").unwrap();
        assert_eq!(verify(&verifier, "correct horse battery "), PasswordCheck::Mismatched);
        assert_eq!(verify(&verifier, ""), PasswordCheck::Mismatched);
    }

    #[test]
    fn test_verifier_is_salted() {
        let first = hash("same-password").unwrap();
        let second = hash("same-password").unwrap();
        assert_ne!(first, second);
        assert!(first.starts_with("$argon2id$"));
        assert!(!first.contains("same-password"));
    }

    #[test]
    fn test_foreign_verifier_is_malformed() {
        assert_eq!(verify("plaintext", "plaintext"), PasswordCheck::Malformed);
        assert_eq!(verify("", "anything"), PasswordCheck::Malformed);
        // bcrypt strings are not PHC strings
        assert_eq!(
            verify(
                "$2a$10$N9qo8uLOickgx2ZMRZoMyeIjZAgcfl7p92ldGxad68LJZdL17lhWy",
                "anything"
            ),
            PasswordCheck::Malformed
        );
    }
}
