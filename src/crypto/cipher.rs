//! AES-256-GCM encryption for short text fields stored at rest.
//!
//! Output layout is `base64(nonce (12 bytes) || ciphertext || tag)`, so a
//! ciphertext can travel inside JSON and text columns unchanged.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64ct::{Base64, Encoding};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
    #[error("failed to generate nonce")]
    Nonce,
    #[error("encryption failure")]
    Encryption,
    #[error("malformed ciphertext")]
    Malformed,
    #[error("authentication failed")]
    AuthenticationFailed,
}

/// Symmetric cipher bound to the application key.
///
/// The key length is checked once in [`Cipher::new`]; a constructed cipher can
/// not hold a key of the wrong size.
#[derive(Clone)]
pub struct Cipher {
    aead: Aes256Gcm,
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher").field("key", &"***").finish()
    }
}

impl Cipher {
    /// Build a cipher from a raw 256-bit key.
    ///
    /// # Errors
    /// Returns `InvalidKeyLength` if `key` is not exactly 32 bytes.
    pub fn new(key: &[u8]) -> Result<Self, CipherError> {
        if key.len() != KEY_LEN {
            return Err(CipherError::InvalidKeyLength {
                expected: KEY_LEN,
                actual: key.len(),
            });
        }

        let aead = Aes256Gcm::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength {
            expected: KEY_LEN,
            actual: key.len(),
        })?;

        Ok(Self { aead })
    }

    /// Encrypt `plaintext` under a fresh random nonce.
    ///
    /// # Errors
    /// Returns an error if the OS random source fails or the AEAD rejects the input.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng
            .try_fill_bytes(&mut nonce_bytes)
            .map_err(|_| CipherError::Nonce)?;

        let ciphertext = self
            .aead
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| CipherError::Encryption)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);

        Ok(Base64::encode_string(&sealed))
    }

    /// Decrypt text produced by [`Cipher::encrypt`].
    ///
    /// # Errors
    /// `Malformed` when the input is not base64, is shorter than a nonce or does
    /// not decrypt to UTF-8; `AuthenticationFailed` when the tag does not verify.
    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        let sealed = Base64::decode_vec(ciphertext.trim()).map_err(|_| CipherError::Malformed)?;

        if sealed.len() < NONCE_LEN {
            return Err(CipherError::Malformed);
        }

        let (nonce_bytes, body) = sealed.split_at(NONCE_LEN);

        let plaintext = self
            .aead
            .decrypt(Nonce::from_slice(nonce_bytes), body)
            .map_err(|_| CipherError::AuthenticationFailed)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::Malformed)
    }
}
