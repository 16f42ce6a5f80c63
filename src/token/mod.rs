//! Stateless HS256 access tokens.
//!
//! A token carries `iat`, `exp`, an `authorized` flag and the account id
//! encrypted with the application [`Cipher`]. Nothing is stored server side:
//! a token is valid until its expiry and cannot be revoked.

pub mod claims;
pub mod extract;

pub use claims::Claims;
pub use extract::extract;

use crate::{crypto::Cipher, store::AccountId};
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

pub const TOKEN_LIFETIME_HOURS: i64 = 24;
const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid token format")]
    Malformed,
    #[error("invalid signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("invalid token subject")]
    BadSubject,
    #[error("failed to issue token: {0}")]
    Issue(String),
}

/// Issues and verifies access tokens with the server-held secrets.
#[derive(Clone)]
pub struct TokenAuthority {
    cipher: Cipher,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl std::fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("algorithm", &SIGNING_ALGORITHM)
            .field("lifetime", &self.lifetime)
            .field("secret", &"***")
            .finish()
    }
}

impl TokenAuthority {
    #[must_use]
    pub fn new(cipher: Cipher, secret: &[u8]) -> Self {
        // expiry is checked by `verify_at` against an explicit clock
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_string()]);

        Self {
            cipher,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            lifetime: Duration::hours(TOKEN_LIFETIME_HOURS),
        }
    }

    /// Issue a token for `account_id`, valid for 24 hours from now.
    ///
    /// # Errors
    /// Returns an error if the subject cannot be encrypted or the token signed.
    pub fn issue(&self, account_id: AccountId) -> Result<String, TokenError> {
        self.issue_at(account_id, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    ///
    /// # Errors
    /// Returns an error if the subject cannot be encrypted or the token signed.
    pub fn issue_at(&self, account_id: AccountId, now: DateTime<Utc>) -> Result<String, TokenError> {
        let user_id = self
            .cipher
            .encrypt(&account_id.to_string())
            .map_err(|e| TokenError::Issue(e.to_string()))?;

        let claims = Claims {
            authorized: true,
            exp: (now + self.lifetime).timestamp(),
            iat: now.timestamp(),
            user_id,
        };

        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Issue(e.to_string()))
    }

    /// Verify a token and recover the account id it was issued for.
    ///
    /// # Errors
    /// See [`TokenError`]; the signature is checked before expiry and subject.
    pub fn verify(&self, token: &str) -> Result<AccountId, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as if the current time were `now`.
    ///
    /// # Errors
    /// See [`TokenError`].
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<AccountId, TokenError> {
        let claims = self.decode_claims(token)?;

        if claims.is_expired_at(now.timestamp()) {
            debug!("token expired at {}", claims.exp);
            return Err(TokenError::Expired);
        }

        let subject = self
            .cipher
            .decrypt(&claims.user_id)
            .map_err(|_| TokenError::BadSubject)?;

        subject.parse().map_err(|_| TokenError::BadSubject)
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, TokenError> {
        if token.is_empty() {
            return Err(TokenError::Malformed);
        }

        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(err) => match err.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName
                | ErrorKind::MissingAlgorithm => Err(TokenError::BadSignature),
                _ => {
                    // headers such as `"alg":"none"` fail to parse before the
                    // algorithm check, report them as signature failures too
                    if advertised_algorithm(token).is_some_and(|alg| alg != "HS256") {
                        Err(TokenError::BadSignature)
                    } else {
                        debug!("token rejected: {err}");
                        Err(TokenError::Malformed)
                    }
                }
            },
        }
    }
}

/// Read the `alg` field of the token header without trusting anything else.
fn advertised_algorithm(token: &str) -> Option<String> {
    let header = token.split('.').next()?;
    let bytes = Base64UrlUnpadded::decode_vec(header).ok()?;
    let value: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    value.get("alg")?.as_str().map(str::to_string)
}
