use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::subscription::MailRelayConfig;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("mail relay timed out after {0}s")]
    Timeout(u64),
    #[error("mail transport failed: {0}")]
    Transport(String),
    #[error("invalid mail address: {0}")]
    Address(String),
    #[error("could not build message: {0}")]
    Build(String),
    #[error("no mail relay configured")]
    NoRelay,
}

/// A rendered plain-text message for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message, authenticating with `relay`.
    ///
    /// # Errors
    ///
    /// Returns `MailError` if the message cannot be built or the relay
    /// rejects or fails to accept it.
    async fn send(&self, relay: &MailRelayConfig, message: &MailMessage) -> Result<(), MailError>;
}
