use super::{Account, AccountChanges, AccountId, AccountLookup, AccountStore, NewAccount, StoreError};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Process-local store with the same uniqueness rules as the `users` table.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    state: RwLock<State>,
}

#[derive(Debug, Default)]
struct State {
    last_id: AccountId,
    accounts: BTreeMap<AccountId, Account>,
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.accounts.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.accounts.is_empty()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut state = self.state.write().await;

        if state.accounts.values().any(|a| a.email == account.email) {
            return Err(StoreError::Duplicate("users_email_key".to_string()));
        }
        if state.accounts.values().any(|a| a.public_id == account.public_id) {
            return Err(StoreError::Duplicate("users_public_id_key".to_string()));
        }

        state.last_id += 1;
        let stored = Account {
            id: state.last_id,
            public_id: account.public_id,
            name: account.name,
            email: account.email,
            password: account.password,
            created_at: account.created_at,
            updated_at: account.created_at,
        };
        state.accounts.insert(stored.id, stored.clone());

        Ok(stored)
    }

    async fn find_by(&self, lookup: AccountLookup) -> Result<Option<Account>> {
        let state = self.state.read().await;

        Ok(match lookup {
            AccountLookup::Id(id) => state.accounts.get(&id).cloned(),
            AccountLookup::Email(email) => {
                state.accounts.values().find(|a| a.email == email).cloned()
            }
        })
    }

    async fn update(&self, id: AccountId, changes: AccountChanges) -> Result<Option<Account>> {
        let mut state = self.state.write().await;

        let Some(account) = state.accounts.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            account.name = name;
        }
        if let Some(password) = changes.password {
            account.password = password;
        }
        if let Some(updated_at) = changes.updated_at {
            account.updated_at = updated_at;
        }

        Ok(Some(account.clone()))
    }

    async fn delete(&self, id: AccountId) -> Result<Option<String>> {
        let mut state = self.state.write().await;
        Ok(state.accounts.remove(&id).map(|account| account.email))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
