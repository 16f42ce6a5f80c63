use serde::{Deserialize, Serialize};

/// Claim set carried by every access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub authorized: bool,
    /// Expiration, seconds since epoch.
    pub exp: i64,
    /// Issued-at, seconds since epoch.
    pub iat: i64,
    /// Encrypted account id (base64 AEAD ciphertext).
    pub user_id: String,
}

impl Claims {
    #[must_use]
    pub const fn is_expired_at(&self, now: i64) -> bool {
        now > self.exp
    }
}
