//! # auth-global
//!
//! A small user-authentication service: registration, login, profile edits,
//! password changes and resets, and bearer tokens for the protected routes.
//!
//! ## Credentials at rest
//!
//! - Display names are encrypted with AES-256-GCM under the application key
//!   and only decrypted for their owner.
//! - Passwords are stored as Argon2id PHC strings and never leave the service.
//! - Every account gets a public id, the SHA-256 of its email and creation
//!   time, so the numeric row id never has to be shown.
//!
//! ## Tokens
//!
//! A successful login yields an HS256 JWT valid for 24 hours. Its `user_id`
//! claim is the account id encrypted under the application key, so a token
//! does not reveal which row it points to. Tokens are read from the `token`
//! query parameter first and the `Authorization: Bearer` header second.
//!
//! ## Notifications
//!
//! Password notices are queued to a background worker and delivered over
//! SMTP, or only logged when no SMTP host is configured. Delivery never
//! changes the outcome of the request that queued it.

pub mod accounts;
pub mod api;
pub mod cli;
pub mod crypto;
pub mod notify;
pub mod store;
pub mod token;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
