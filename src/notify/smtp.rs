use super::{Mail, Notifier};
use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info_span, Instrument};

#[derive(Clone)]
pub struct SmtpConfig {
    host: String,
    port: u16,
    email: String,
    password: SecretString,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

impl SmtpConfig {
    #[must_use]
    pub fn new(host: impl Into<String>, email: impl Into<String>, password: SecretString) -> Self {
        Self {
            host: host.into(),
            port: 587,
            email: email.into(),
            password,
        }
    }

    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Sender address, also used as the SMTP login.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }
}

/// Delivers mail through an SMTP relay using STARTTLS and plain credentials.
pub struct SmtpNotifier {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl std::fmt::Debug for SmtpNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpNotifier")
            .field("from", &self.from.to_string())
            .finish_non_exhaustive()
    }
}

impl SmtpNotifier {
    /// Build the transport. No connection is opened until the first send.
    ///
    /// # Errors
    /// Returns an error if the sender address is invalid or the relay host
    /// can not be used for TLS.
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let from: Mailbox = config
            .email
            .parse()
            .with_context(|| format!("invalid SMTP sender address: {}", config.email))?;

        let credentials = Credentials::new(
            config.email.clone(),
            config.password.expose_secret().to_string(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .with_context(|| format!("failed to configure SMTP relay {}", config.host))?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self { from, transport })
    }

    /// Render `mail` as a plain-text message from the configured sender.
    ///
    /// # Errors
    /// Returns an error if a recipient address is invalid or there is none.
    pub fn message(&self, mail: &Mail) -> Result<Message> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_PLAIN);

        for to in &mail.to {
            let mailbox: Mailbox = to
                .parse()
                .with_context(|| format!("invalid recipient address: {to}"))?;
            builder = builder.to(mailbox);
        }
        for cc in &mail.cc {
            let mailbox: Mailbox = cc
                .parse()
                .with_context(|| format!("invalid cc address: {cc}"))?;
            builder = builder.cc(mailbox);
        }

        builder
            .body(mail.body.clone())
            .context("failed to build mail message")
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, mail: &Mail) -> Result<()> {
        let message = self.message(mail)?;

        let span = info_span!("smtp.send", smtp.subject = %mail.subject);
        self.transport
            .send(message)
            .instrument(span)
            .await
            .context("SMTP delivery failed")?;

        Ok(())
    }
}
