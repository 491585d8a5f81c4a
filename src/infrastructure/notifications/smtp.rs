//! Digest delivery over SMTP.
//!
//! [`SmtpMailer`] wraps the `lettre` async transport. Host and port come from
//! the application config; the sender address and its credential come from
//! the stored [`MailRelayConfig`] so they can be changed at runtime.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::domain::entities::subscription::MailRelayConfig;
use crate::domain::ports::mailer::{MailError, MailMessage, Mailer};

/// Connection settings for the outbound relay.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    /// STARTTLS on a plain port when true, implicit TLS otherwise.
    pub starttls: bool,
    pub timeout: Duration,
}

pub struct SmtpMailer {
    settings: SmtpSettings,
}

impl SmtpMailer {
    #[must_use]
    pub const fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    fn transport(
        &self,
        relay: &MailRelayConfig,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        let builder = if self.settings.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.settings.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.settings.host)
        }
        .map_err(|e| MailError::Transport(e.to_string()))?;

        Ok(builder
            .port(self.settings.port)
            .timeout(Some(self.settings.timeout))
            .credentials(Credentials::new(
                relay.sender.clone(),
                relay.credential.clone(),
            ))
            .build())
    }
}

/// Assemble a plain-text message from `relay.sender` to `message.to`.
///
/// # Errors
///
/// Returns `MailError::Address` for an unparsable sender or recipient and
/// `MailError::Build` if the MIME message cannot be assembled.
pub fn build_message(relay: &MailRelayConfig, message: &MailMessage) -> Result<Message, MailError> {
    let from: Mailbox = relay
        .sender
        .parse()
        .map_err(|e: lettre::address::AddressError| MailError::Address(format!("{}: {e}", relay.sender)))?;
    let to: Mailbox = message
        .to
        .parse()
        .map_err(|e: lettre::address::AddressError| MailError::Address(format!("{}: {e}", message.to)))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject.clone())
        .header(ContentType::TEXT_PLAIN)
        .body(message.body.clone())
        .map_err(|e| MailError::Build(e.to_string()))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, relay: &MailRelayConfig, message: &MailMessage) -> Result<(), MailError> {
        let email = build_message(relay, message)?;
        let transport = self.transport(relay)?;
        transport
            .send(email)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        tracing::info!(to = %message.to, "Digest email sent");
        Ok(())
    }
}
