use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid email address: {0}")]
pub struct InvalidAddress(pub String);

/// An address that receives the alert digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailSubscription {
    pub email: String,
}

impl EmailSubscription {
    /// Validate and normalize an address: surrounding whitespace is trimmed
    /// and the address is lowercased, so differently cased spellings dedupe.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` unless the input has exactly one `@` with a
    /// non-empty local part, a dotted domain, and no inner whitespace.
    pub fn parse(raw: &str) -> Result<Self, InvalidAddress> {
        let email = raw.trim();
        let valid = match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !email.chars().any(char::is_whitespace)
            }
            None => false,
        };
        if valid {
            Ok(Self {
                email: email.to_lowercase(),
            })
        } else {
            Err(InvalidAddress(raw.to_string()))
        }
    }
}

/// Sender identity used to authenticate against the mail relay.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailRelayConfig {
    pub sender: String,
    pub credential: String,
}

impl fmt::Debug for MailRelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailRelayConfig")
            .field("sender", &self.sender)
            .field("credential", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_and_trims_plain_addresses() {
        let sub = EmailSubscription::parse("  ops@example.com ").unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(sub.email, "ops@example.com");
    }

    #[test]
    fn parse_lowercases_so_case_variants_compare_equal() {
        let upper = EmailSubscription::parse("Ops@Example.COM").unwrap_or_else(|e| panic!("{e}"));
        let lower = EmailSubscription::parse("ops@example.com").unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(upper.email, "ops@example.com");
        assert_eq!(upper, lower);
    }

    #[test]
    fn parse_rejects_malformed_addresses() {
        for raw in ["", "ops", "@example.com", "ops@", "ops@localhost", "a@b@c.com", "o ps@x.io", "ops@.com"] {
            assert!(EmailSubscription::parse(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn relay_debug_hides_credential() {
        let relay = MailRelayConfig {
            sender: "bot@example.com".into(),
            credential: "hunter2".into(),
        };
        let debug = format!("{relay:?}");
        assert!(debug.contains("bot@example.com"));
        assert!(!debug.contains("hunter2"));
    }
}
