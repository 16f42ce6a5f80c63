//! Map validated CLI matches to the action to run.

use crate::cli::{
    actions::{server::Args, Action},
    commands::{self, database, secrets, smtp},
};
use crate::crypto::cipher::KEY_LEN;
use anyhow::{bail, Result};
use secrecy::ExposeSecret;

/// Build the server action, rejecting unusable secrets before anything binds.
///
/// # Errors
/// Returns an error if a required argument is missing, the application key
/// is not exactly 32 bytes, or the signing secret is empty.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches
        .get_one::<u16>(commands::ARG_PORT)
        .copied()
        .unwrap_or(8080);

    let globals = secrets::parse(matches)?;
    if globals.app_key_len() != KEY_LEN {
        bail!(
            "APP_KEY must be exactly {KEY_LEN} bytes, got {}",
            globals.app_key_len()
        );
    }
    if globals.api_secret.expose_secret().is_empty() {
        bail!("API_SECRET must not be empty");
    }

    let dsn = database::Options::parse(matches)?.dsn()?;
    let smtp = smtp::Options::parse(matches);

    Ok(Action::Server(Args {
        port,
        dsn,
        globals,
        smtp_relay: smtp.relay,
        mail_sender: smtp.sender,
        allow_visible_reset: matches.get_flag(commands::ARG_ALLOW_VISIBLE_RESET),
    }))
}
