use crate::notify::SmtpConfig;
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_SMTP_HOST: &str = "smtp-host";
pub const ARG_SMTP_PORT: &str = "smtp-port";
pub const ARG_SMTP_EMAIL: &str = "smtp-email";
pub const ARG_SMTP_PASSWORD: &str = "smtp-password";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SMTP_HOST)
                .long(ARG_SMTP_HOST)
                .help("SMTP relay host; mail is only logged when unset")
                .env("CONFIG_SMTP_HOST"),
        )
        .arg(
            Arg::new(ARG_SMTP_PORT)
                .long(ARG_SMTP_PORT)
                .help("SMTP relay port")
                .env("CONFIG_SMTP_PORT")
                .default_value("587")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_SMTP_EMAIL)
                .long(ARG_SMTP_EMAIL)
                .help("Sender address, also the SMTP login")
                .env("CONFIG_SMTP_EMAIL"),
        )
        .arg(
            Arg::new(ARG_SMTP_PASSWORD)
                .long(ARG_SMTP_PASSWORD)
                .help("SMTP password")
                .env("CONFIG_SMTP_PASSWORD")
                .hide_env_values(true),
        )
}

#[derive(Debug)]
pub struct Options {
    /// Relay settings, present only when a host is configured.
    pub relay: Option<SmtpConfig>,
    pub sender: Option<String>,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        let non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .filter(|value| !value.is_empty())
                .cloned()
        };

        let sender = non_empty(ARG_SMTP_EMAIL);
        let relay = non_empty(ARG_SMTP_HOST).map(|host| {
            SmtpConfig::new(
                host,
                sender.clone().unwrap_or_default(),
                SecretString::from(non_empty(ARG_SMTP_PASSWORD).unwrap_or_default()),
            )
            .with_port(matches.get_one::<u16>(ARG_SMTP_PORT).copied().unwrap_or(587))
        });

        Self { relay, sender }
    }
}
