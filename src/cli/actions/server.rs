use crate::{
    accounts::AccountService,
    api::{self, AppContext},
    cli::globals::GlobalArgs,
    crypto::Cipher,
    notify::{queue, LogNotifier, NotificationQueue, Notifier, SmtpConfig, SmtpNotifier},
    store::PgAccountStore,
    token::TokenAuthority,
};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};

const MAIL_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Args {
    pub port: u16,
    pub dsn: SecretString,
    pub globals: GlobalArgs,
    pub smtp_relay: Option<SmtpConfig>,
    pub mail_sender: Option<String>,
    pub allow_visible_reset: bool,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("dsn", &"***")
            .field("globals", &self.globals)
            .field("smtp_relay", &self.smtp_relay)
            .field("mail_sender", &self.mail_sender)
            .field("allow_visible_reset", &self.allow_visible_reset)
            .finish()
    }
}

/// Execute the server action.
///
/// # Errors
/// Returns an error if the key is unusable, the database can not be reached
/// or prepared, the SMTP relay is misconfigured, or the server fails.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Server args: {:?}", args);

    // fail before touching the database
    let cipher = Cipher::new(args.globals.app_key.expose_secret().as_bytes())
        .context("Invalid APP_KEY")?;
    let tokens = TokenAuthority::new(
        cipher.clone(),
        args.globals.api_secret.expose_secret().as_bytes(),
    );

    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(args.dsn.expose_secret())
        .await
        .context("Failed to connect to database")?;

    let store = PgAccountStore::new(pool);
    store.ensure_schema().await?;

    let notifier: Arc<dyn Notifier> = match &args.smtp_relay {
        Some(relay) => {
            info!("Delivering mail through {}:{}", relay.host(), relay.port());
            Arc::new(SmtpNotifier::new(relay)?)
        }
        None => {
            info!("No SMTP host configured, mail will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let (notifications, worker) = NotificationQueue::spawn(notifier.clone());

    let accounts = AccountService::new(Arc::new(store), cipher, tokens, notifications)
        .with_visible_reset(args.allow_visible_reset);

    let ctx = AppContext::new(accounts, notifier, args.globals.api_secret)
        .with_accepted_token(args.globals.accepted_token)
        .with_mail_sender(args.mail_sender);

    // the router held the last queue handle
    let served = api::new(args.port, Arc::new(ctx)).await;
    queue::drain(worker, MAIL_DRAIN_TIMEOUT).await;

    served
}
