use thiserror::Error;

/// Failures of the account flows. Only the curated message of a variant
/// ever reaches a client; `Internal` causes are logged and replaced.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub const INTERNAL_MESSAGE: &str = "something went wrong";

impl Error {
    /// Message safe to hand to a client.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(msg)
            | Self::Authentication(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::Internal(_) => INTERNAL_MESSAGE.to_string(),
        }
    }
}

/// Map a raw failure description to the short message shown to clients.
///
/// The lookup runs on substrings, so a violated constraint name such as
/// `users_email_key` maps to the message for `email`.
#[must_use]
pub fn curated_message(raw: &str) -> &'static str {
    if raw.contains("name") {
        "name already taken"
    } else if raw.contains("email") {
        "email already taken"
    } else if raw.contains("hashedPassword") {
        "incorrect email or password"
    } else if raw.contains("exists") {
        "user already exists"
    } else if raw.contains("notFound") {
        "user not found"
    } else {
        "incorrect details"
    }
}
