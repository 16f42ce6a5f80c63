use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

pub const ARG_DB_HOST: &str = "db-host";
pub const ARG_DB_PORT: &str = "db-port";
pub const ARG_DB_USER: &str = "db-user";
pub const ARG_DB_PASSWORD: &str = "db-password";
pub const ARG_DB_NAME: &str = "db-name";
pub const ARG_DB_SSLMODE: &str = "db-sslmode";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_DB_HOST)
                .long(ARG_DB_HOST)
                .help("PostgreSQL host")
                .env("DB_HOST")
                .default_value("localhost"),
        )
        .arg(
            Arg::new(ARG_DB_PORT)
                .long(ARG_DB_PORT)
                .help("PostgreSQL port")
                .env("DB_PORT")
                .default_value("5432")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_DB_USER)
                .long(ARG_DB_USER)
                .help("PostgreSQL user")
                .env("DB_USER")
                .required(true),
        )
        .arg(
            Arg::new(ARG_DB_PASSWORD)
                .long(ARG_DB_PASSWORD)
                .help("PostgreSQL password")
                .env("DB_PASSWORD")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_DB_NAME)
                .long(ARG_DB_NAME)
                .help("PostgreSQL database name")
                .env("DB_NAME")
                .required(true),
        )
        .arg(
            Arg::new(ARG_DB_SSLMODE)
                .long(ARG_DB_SSLMODE)
                .help("PostgreSQL sslmode: disable, prefer, require, verify-ca, verify-full")
                .env("DB_SSLMODE")
                .default_value("disable"),
        )
}

#[derive(Debug)]
pub struct Options {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: SecretString,
    pub name: String,
    pub sslmode: String,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let required = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .with_context(|| format!("missing required argument: --{id}"))
        };

        Ok(Self {
            host: required(ARG_DB_HOST)?,
            port: matches.get_one::<u16>(ARG_DB_PORT).copied().unwrap_or(5432),
            user: required(ARG_DB_USER)?,
            password: SecretString::from(required(ARG_DB_PASSWORD)?),
            name: required(ARG_DB_NAME)?,
            sslmode: required(ARG_DB_SSLMODE)?,
        })
    }

    /// Connection string with credentials and `sslmode` filled in.
    ///
    /// # Errors
    /// Returns an error if the host or credentials can not form a valid URL.
    pub fn dsn(&self) -> Result<SecretString> {
        let mut dsn = Url::parse(&format!("postgres://{}:{}/", self.host, self.port))
            .with_context(|| format!("invalid database host: {}", self.host))?;

        dsn.set_path(&format!("/{}", self.name));
        dsn.set_username(&self.user)
            .map_err(|()| anyhow!("Error setting username"))?;
        dsn.set_password(Some(self.password.expose_secret()))
            .map_err(|()| anyhow!("Error setting password"))?;
        dsn.query_pairs_mut().append_pair("sslmode", &self.sslmode);

        Ok(SecretString::from(dsn.to_string()))
    }
}
