use anyhow::Context;

use crate::domain::entities::subscription::{EmailSubscription, MailRelayConfig};
use crate::domain::ports::store::SubscriptionStore;

/// Returns whether the address was newly added.
///
/// # Errors
///
/// Returns an error for a malformed address or a store failure.
pub fn run_subscribe(store: &dyn SubscriptionStore, email: &str) -> anyhow::Result<bool> {
    let subscription = EmailSubscription::parse(email)?;
    let added = store
        .add_subscription(&subscription)
        .context("Failed to save subscription")?;
    if added {
        println!("Subscribed {}.", subscription.email);
    } else {
        println!("{} is already subscribed.", subscription.email);
    }
    Ok(added)
}

/// Replace the sender account used for digest mail.
///
/// # Errors
///
/// Returns an error for a malformed sender address or a store failure.
pub fn run_relay(
    store: &dyn SubscriptionStore,
    sender: &str,
    credential: &str,
) -> anyhow::Result<()> {
    let sender = EmailSubscription::parse(sender)?.email;
    store
        .upsert_relay(&MailRelayConfig {
            sender: sender.clone(),
            credential: credential.to_string(),
        })
        .context("Failed to save mail relay")?;
    println!("Digest mail will be sent from {sender}.");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::in_memory_store::InMemoryStore;

    #[test]
    fn subscribe_is_idempotent() {
        let store = InMemoryStore::new();
        assert!(run_subscribe(&store, " ops@example.com ").expect("first"));
        assert!(!run_subscribe(&store, "ops@example.com").expect("second"));
        assert!(!run_subscribe(&store, "Ops@Example.com").expect("case variant"));
        assert_eq!(store.subscriptions().expect("list").len(), 1);
    }

    #[test]
    fn subscribe_rejects_bad_address() {
        let store = InMemoryStore::new();
        assert!(run_subscribe(&store, "not-an-address").is_err());
    }

    #[test]
    fn relay_is_replaced() {
        let store = InMemoryStore::new();
        run_relay(&store, "a@example.com", "one").expect("first");
        run_relay(&store, "b@example.com", "two").expect("second");
        let relay = store.relay().expect("read").expect("present");
        assert_eq!(relay.sender, "b@example.com");
        assert_eq!(relay.credential, "two");
    }
}
