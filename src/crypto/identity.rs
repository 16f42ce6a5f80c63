use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

/// Derive the public identifier of an account.
///
/// SHA-256 over the email followed by the creation time (RFC 3339, microseconds),
/// as 64 lowercase hex characters. Only called once, when the account is created.
#[must_use]
pub fn allocate(email: &str, created_at: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.as_bytes());
    hasher.update(
        created_at
            .to_rfc3339_opts(SecondsFormat::Micros, true)
            .as_bytes(),
    );
    format!("{:x}", hasher.finalize())
}
