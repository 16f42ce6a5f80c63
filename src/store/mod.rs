//! Account persistence.
//!
//! [`AccountStore`] is the only way the rest of the crate reaches stored
//! accounts. `PgAccountStore` backs the running service; `MemoryAccountStore`
//! backs tests and local experiments. Uniqueness of `email` and `public_id` is
//! enforced here, never by in-process coordination.

pub mod memory;
pub mod postgres;

pub use memory::MemoryAccountStore;
pub use postgres::PgAccountStore;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub type AccountId = i64;

/// A stored account. `name` holds the encrypted display name.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub public_id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("public_id", &"***")
            .field("email", &self.email)
            .field("password", &"***")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

/// Everything needed to insert an account; the store assigns the id.
#[derive(Clone)]
pub struct NewAccount {
    pub public_id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountLookup {
    Id(AccountId),
    Email(String),
}

/// Columns an identity-bound update may touch.
#[derive(Clone, Default)]
pub struct AccountChanges {
    pub name: Option<String>,
    pub password: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the insert; carries the constraint name.
    #[error("duplicate value violates unique constraint \"{0}\"")]
    Duplicate(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new account, rejecting a duplicate email or public id.
    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// First account matching `lookup`, if any.
    async fn find_by(&self, lookup: AccountLookup) -> Result<Option<Account>>;

    /// Apply `changes` to the account with `id`; `None` when no such account.
    async fn update(&self, id: AccountId, changes: AccountChanges) -> Result<Option<Account>>;

    /// Delete the account with `id`, returning its email.
    async fn delete(&self, id: AccountId) -> Result<Option<String>>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<()>;
}
