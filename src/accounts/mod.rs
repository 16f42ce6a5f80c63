//! Credential lifecycle: registration, login, profile and password flows.

pub mod error;
pub mod service;
pub mod validate;

pub use error::{curated_message, Error};
pub use service::{AccountService, AccountView, LoginOutcome, ResetOutcome};
