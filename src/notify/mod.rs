//! Out-of-band account notices.
//!
//! Request handlers never talk to a mail server. They hand a [`Mail`] to the
//! [`NotificationQueue`], a single background task drains it through a
//! [`Notifier`] and logs delivery failures. A failed or slow delivery can not
//! fail or delay the request that queued it.
//!
//! `SmtpNotifier` delivers through an SMTP relay with STARTTLS; `LogNotifier`
//! is used when no SMTP host is configured and only logs the envelope.

pub mod queue;
pub mod smtp;

pub use queue::NotificationQueue;
pub use smtp::{SmtpConfig, SmtpNotifier};

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

#[derive(Clone, PartialEq, Eq)]
pub struct Mail {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub subject: String,
    pub body: String,
}

// bodies may carry generated passwords
impl std::fmt::Debug for Mail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mail")
            .field("to", &self.to)
            .field("cc", &self.cc)
            .field("subject", &self.subject)
            .field("body", &"***")
            .finish()
    }
}

impl Mail {
    #[must_use]
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: vec![to.into()],
            cc: Vec::new(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Mail delivery abstraction used by the notification worker.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `mail` or return an error describing why it was not sent.
    async fn send(&self, mail: &Mail) -> Result<()>;
}

/// Sender for deployments without SMTP: logs the envelope, never the body.
#[derive(Clone, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, mail: &Mail) -> Result<()> {
        info!(
            to = ?mail.to,
            cc = ?mail.cc,
            subject = %mail.subject,
            body_len = mail.body.len(),
            "notification send stub"
        );
        Ok(())
    }
}
