use crate::cli::globals::GlobalArgs;
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_APP_KEY: &str = "app-key";
pub const ARG_API_SECRET: &str = "api-secret";
pub const ARG_ACCEPTED_TOKEN: &str = "accepted-token";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_APP_KEY)
                .long(ARG_APP_KEY)
                .help("Key for encrypting names and token subjects, exactly 32 bytes")
                .env("APP_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_API_SECRET)
                .long(ARG_API_SECRET)
                .help("Secret for signing bearer tokens")
                .env("API_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_ACCEPTED_TOKEN)
                .long(ARG_ACCEPTED_TOKEN)
                .help("Token accepted by /api-secret; the route answers 404 when unset")
                .env("ACCEPTED_TOKEN")
                .hide_env_values(true),
        )
}

/// Read the secret arguments into [`GlobalArgs`].
///
/// # Errors
/// Returns an error if a required argument is missing.
pub fn parse(matches: &ArgMatches) -> Result<GlobalArgs> {
    let app_key = matches
        .get_one::<String>(ARG_APP_KEY)
        .cloned()
        .context("missing required argument: --app-key")?;
    let api_secret = matches
        .get_one::<String>(ARG_API_SECRET)
        .cloned()
        .context("missing required argument: --api-secret")?;
    let accepted_token = matches
        .get_one::<String>(ARG_ACCEPTED_TOKEN)
        .filter(|token| !token.is_empty())
        .cloned()
        .map(SecretString::from);

    Ok(GlobalArgs::new(
        SecretString::from(app_key),
        SecretString::from(api_secret),
    )
    .with_accepted_token(accepted_token))
}
