use serde::{Deserialize, Serialize};

/// Ordering of "mark alerts sent" relative to "send the digest".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryPolicy {
    /// Send first, mark once at least one recipient accepted the message.
    /// A failed firing is retried on the next one; duplicates are possible.
    #[default]
    SendThenMark,
    /// Mark first, then send. Never duplicates, but a relay failure loses
    /// the digest for good.
    MarkThenSend,
}

impl std::fmt::Display for DeliveryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SendThenMark => write!(f, "send-then-mark"),
            Self::MarkThenSend => write!(f, "mark-then-send"),
        }
    }
}
