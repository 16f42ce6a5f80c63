use super::{
    curated_message,
    validate::{prepare, validate, Fields, Flow},
    Error,
};
use crate::{
    crypto::{identity, password, Cipher, PasswordCheck},
    notify::{Mail, NotificationQueue},
    store::{Account, AccountChanges, AccountId, AccountLookup, AccountStore, NewAccount, StoreError},
    token::TokenAuthority,
};
use anyhow::Context;
use chrono::{DateTime, SubsecRound, Utc};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use std::sync::{Arc, OnceLock};
use tracing::{error, info, instrument, warn};

pub const GENERATED_PASSWORD_LEN: usize = 20;

const PASSWORD_CHANGED_SUBJECT: &str = "New Password Change!";
const PASSWORD_CHANGED_BODY: &str =
    "Your password is successfully changed.\nIf this action is not from you, please contact us.";
const PASSWORD_RESET_SUBJECT: &str = "Change Password";

/// An account as its owner sees it: decrypted name, no verifier.
#[derive(Clone, PartialEq, Eq)]
pub struct AccountView {
    pub id: AccountId,
    pub public_id: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for AccountView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountView")
            .field("id", &self.id)
            .field("public_id", &"***")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub email: String,
    pub name: String,
}

impl std::fmt::Debug for LoginOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginOutcome")
            .field("token", &"***")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct ResetOutcome {
    pub email: String,
    /// Present only for visible resets on a server that allows them.
    pub generated_password: Option<String>,
    pub request_time: DateTime<Utc>,
}

impl std::fmt::Debug for ResetOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetOutcome")
            .field("email", &self.email)
            .field("visible", &self.generated_password.is_some())
            .field("request_time", &self.request_time)
            .finish()
    }
}

/// Runs the credential flows against a store.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    cipher: Cipher,
    tokens: TokenAuthority,
    notifications: NotificationQueue,
    allow_visible_reset: bool,
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService")
            .field("allow_visible_reset", &self.allow_visible_reset)
            .finish_non_exhaustive()
    }
}

fn authentication_failure() -> Error {
    Error::Authentication(curated_message("hashedPassword").to_string())
}

fn token_subject_missing() -> Error {
    Error::Authentication("unauthorized".to_string())
}

// verifier checked against unknown emails so both paths pay the same cost
fn decoy_verifier() -> Option<&'static str> {
    static DECOY: OnceLock<Option<String>> = OnceLock::new();
    DECOY
        .get_or_init(|| password::hash("decoy password for unknown accounts").ok())
        .as_deref()
}

async fn hash_password(plain: &str) -> Result<String, Error> {
    let plain = plain.to_string();
    let verifier = tokio::task::spawn_blocking(move || password::hash(&plain))
        .await
        .context("password hashing task failed")?
        .context("failed to hash password")?;
    Ok(verifier)
}

async fn check_password(verifier: Option<String>, plain: &str) -> Result<PasswordCheck, Error> {
    let plain = plain.to_string();
    let check = tokio::task::spawn_blocking(move || match verifier {
        Some(verifier) => password::verify(&verifier, &plain),
        None => {
            if let Some(decoy) = decoy_verifier() {
                let _ = password::verify(decoy, &plain);
            }
            PasswordCheck::Mismatched
        }
    })
    .await
    .context("password verification task failed")?;
    Ok(check)
}

fn generate_password() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

fn reset_body(email: &str, generated: &str) -> String {
    format!(
        "Hello {email},\nWe would like to inform your newly generated password. Please use below:\n{generated}\n\nThanks"
    )
}

impl AccountService {
    #[must_use]
    pub fn new(
        store: Arc<dyn AccountStore>,
        cipher: Cipher,
        tokens: TokenAuthority,
        notifications: NotificationQueue,
    ) -> Self {
        Self {
            store,
            cipher,
            tokens,
            notifications,
            allow_visible_reset: false,
        }
    }

    #[must_use]
    pub const fn with_visible_reset(mut self, allow: bool) -> Self {
        self.allow_visible_reset = allow;
        self
    }

    #[must_use]
    pub const fn tokens(&self) -> &TokenAuthority {
        &self.tokens
    }

    /// Check that the store is reachable.
    ///
    /// # Errors
    /// Returns the store failure.
    pub async fn ping(&self) -> anyhow::Result<()> {
        self.store.ping().await
    }

    fn view(&self, account: Account) -> Result<AccountView, Error> {
        let name = self
            .cipher
            .decrypt(&account.name)
            .with_context(|| format!("failed to decrypt name of account {}", account.id))?;

        Ok(AccountView {
            id: account.id,
            public_id: account.public_id,
            name,
            email: account.email,
            created_at: account.created_at,
            updated_at: account.updated_at,
        })
    }

    async fn fetch(&self, lookup: AccountLookup) -> Result<Option<Account>, Error> {
        Ok(self.store.find_by(lookup).await?)
    }

    async fn apply(&self, id: AccountId, changes: AccountChanges) -> Result<Account, Error> {
        self.store
            .update(id, changes)
            .await?
            .ok_or_else(token_subject_missing)
    }

    /// Create an account and return it with the decrypted name.
    ///
    /// # Errors
    /// `Validation` for bad input, `Conflict` when the email is taken,
    /// `Internal` for store or crypto failures.
    #[instrument(skip_all)]
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<AccountView, Error> {
        let name = prepare(name);
        let email = prepare(email);
        validate(
            Flow::Register,
            Fields {
                name: Some(&name),
                email: Some(&email),
                password: Some(password),
            },
        )?;

        let created_at = Utc::now().trunc_subsecs(6);
        let verifier = hash_password(password).await?;
        let public_id = identity::allocate(&email, created_at);
        let encrypted_name = self.cipher.encrypt(&name).context("failed to encrypt name")?;

        let account = match self
            .store
            .insert(NewAccount {
                public_id,
                name: encrypted_name,
                email,
                password: verifier,
                created_at,
            })
            .await
        {
            Ok(account) => account,
            Err(StoreError::Duplicate(constraint)) => {
                info!("registration rejected: {constraint}");
                return Err(Error::Conflict(curated_message(&constraint).to_string()));
            }
            Err(StoreError::Backend(err)) => return Err(Error::Internal(err)),
        };

        info!(account_id = account.id, "account registered");

        Ok(AccountView {
            id: account.id,
            public_id: account.public_id,
            name,
            email: account.email,
            created_at: account.created_at,
            updated_at: account.updated_at,
        })
    }

    /// Verify credentials and issue a bearer token.
    ///
    /// # Errors
    /// `Authentication` with the same message for unknown emails, wrong
    /// passwords and unreadable verifiers.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, Error> {
        let email = prepare(email);
        validate(
            Flow::Login,
            Fields {
                email: Some(&email),
                password: Some(password),
                ..Fields::default()
            },
        )?;

        let account = self.fetch(AccountLookup::Email(email)).await?;
        let verifier = account.as_ref().map(|account| account.password.clone());

        match check_password(verifier, password).await? {
            PasswordCheck::Matched => {}
            PasswordCheck::Mismatched => return Err(authentication_failure()),
            PasswordCheck::Malformed => {
                warn!("stored password verifier could not be parsed");
                return Err(authentication_failure());
            }
        }

        let Some(account) = account else {
            return Err(authentication_failure());
        };

        let token = self
            .tokens
            .issue(account.id)
            .context("failed to issue token")?;
        let view = self.view(account)?;

        info!(account_id = view.id, "login succeeded");

        Ok(LoginOutcome {
            token,
            email: view.email,
            name: view.name,
        })
    }

    /// The account a verified token refers to.
    ///
    /// # Errors
    /// `Authentication` when the account no longer exists.
    #[instrument(skip(self))]
    pub async fn show(&self, id: AccountId) -> Result<AccountView, Error> {
        let account = self
            .fetch(AccountLookup::Id(id))
            .await?
            .ok_or_else(token_subject_missing)?;
        self.view(account)
    }

    /// Replace the display name of account `id`.
    ///
    /// # Errors
    /// `Validation` for an empty name, `Authentication` when the account is gone.
    #[instrument(skip(self, name))]
    pub async fn update_profile(&self, id: AccountId, name: &str) -> Result<AccountView, Error> {
        let name = prepare(name);
        validate(
            Flow::UpdateProfile,
            Fields {
                name: Some(&name),
                ..Fields::default()
            },
        )?;

        let encrypted_name = self.cipher.encrypt(&name).context("failed to encrypt name")?;
        let account = self
            .apply(
                id,
                AccountChanges {
                    name: Some(encrypted_name),
                    updated_at: Some(Utc::now().trunc_subsecs(6)),
                    ..AccountChanges::default()
                },
            )
            .await?;

        Ok(AccountView {
            id: account.id,
            public_id: account.public_id,
            name,
            email: account.email,
            created_at: account.created_at,
            updated_at: account.updated_at,
        })
    }

    /// Store a new password for account `id`, optionally queueing a notice.
    ///
    /// # Errors
    /// `Validation` for a short password, `Authentication` when the account is gone.
    #[instrument(skip(self, password))]
    pub async fn change_password(
        &self,
        id: AccountId,
        password: &str,
        notify: bool,
    ) -> Result<AccountView, Error> {
        validate(
            Flow::ChangePassword,
            Fields {
                password: Some(password),
                ..Fields::default()
            },
        )?;

        let verifier = hash_password(password).await?;
        let account = self
            .apply(
                id,
                AccountChanges {
                    password: Some(verifier),
                    updated_at: Some(Utc::now().trunc_subsecs(6)),
                    ..AccountChanges::default()
                },
            )
            .await?;

        info!(account_id = account.id, "password changed");

        if notify {
            self.notifications.enqueue(Mail::new(
                account.email.clone(),
                PASSWORD_CHANGED_SUBJECT,
                PASSWORD_CHANGED_BODY,
            ));
        }

        self.view(account)
    }

    /// Replace the password of the account registered with `email` by a
    /// generated one.
    ///
    /// # Errors
    /// `Validation` for a bad email, `NotFound` when no account has it.
    #[instrument(skip_all)]
    pub async fn forget_password(
        &self,
        email: &str,
        visible: bool,
        notify: bool,
    ) -> Result<ResetOutcome, Error> {
        let email = prepare(email);
        validate(
            Flow::ForgetPassword,
            Fields {
                email: Some(&email),
                ..Fields::default()
            },
        )?;

        let request_time = Utc::now().trunc_subsecs(6);
        let account = self
            .fetch(AccountLookup::Email(email.clone()))
            .await?
            .ok_or_else(|| Error::NotFound(curated_message("notFound").to_string()))?;

        let generated = generate_password();
        let verifier = hash_password(&generated).await?;
        self.apply(
            account.id,
            AccountChanges {
                password: Some(verifier),
                updated_at: Some(request_time),
                ..AccountChanges::default()
            },
        )
        .await?;

        info!(account_id = account.id, "password reset");

        if notify {
            self.notifications.enqueue(Mail::new(
                email.clone(),
                PASSWORD_RESET_SUBJECT,
                reset_body(&email, &generated),
            ));
        }

        if visible && !self.allow_visible_reset {
            warn!("visible password reset requested but not enabled");
        }

        Ok(ResetOutcome {
            email,
            generated_password: (visible && self.allow_visible_reset).then_some(generated),
            request_time,
        })
    }

    /// Delete account `id`, returning its email.
    ///
    /// # Errors
    /// `NotFound` when there is no such account.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: AccountId) -> Result<String, Error> {
        match self.store.delete(id).await {
            Ok(Some(email)) => {
                info!(account_id = id, "account deleted");
                Ok(email)
            }
            Ok(None) => Err(Error::NotFound(curated_message("notFound").to_string())),
            Err(err) => {
                error!("failed to delete account {id}: {err:#}");
                Err(Error::Internal(err))
            }
        }
    }
}
