use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use webspecs::application::services::digest::{DigestOutcome, DigestScheduler, DigestSettings};
use webspecs::domain::entities::alert::AlertEvent;
use webspecs::domain::entities::subscription::{EmailSubscription, MailRelayConfig};
use webspecs::domain::ports::mailer::{MailError, MailMessage, Mailer};
use webspecs::domain::ports::store::{AlertStore, SubscriptionStore};
use webspecs::infrastructure::persistence::sqlite_store::SqliteStore;

use crate::{ts, FixedClock};

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<MailMessage>>,
}

#[async_trait]
impl Mailer for Outbox {
    async fn send(&self, _relay: &MailRelayConfig, message: &MailMessage) -> Result<(), MailError> {
        self.sent.lock().expect("lock").push(message.clone());
        Ok(())
    }
}

#[tokio::test]
async fn hourly_digest_against_sqlite() {
    let dir = TempDir::new().expect("tempdir");
    let db = dir.path().join("webspecs.db");
    let store = Arc::new(SqliteStore::new(db.to_str().expect("utf8")).expect("sqlite"));
    store
        .add_subscription(&EmailSubscription::parse("ops@example.com").expect("valid"))
        .expect("subscribe");
    store
        .upsert_relay(&MailRelayConfig {
            sender: "monitor@example.com".into(),
            credential: "secret".into(),
        })
        .expect("relay");
    AlertStore::append(
        store.as_ref(),
        &[
            AlertEvent::new(ts(10, 5), "cpu-percent-core_1".into(), 91.0, 80.0),
            AlertEvent::new(ts(10, 20), "cpu-percent-core_1".into(), 92.5, 80.0),
            AlertEvent::new(ts(10, 50), "cpu-percent-core_1".into(), 95.0, 80.0),
        ],
    )
    .expect("append");

    let outbox = Arc::new(Outbox::default());
    let clock = Arc::new(FixedClock::at(11, 0));
    let digest = DigestScheduler::new(
        store.clone(),
        store.clone(),
        outbox.clone(),
        clock.clone(),
        DigestSettings::default(),
    );

    assert_eq!(
        digest.fire().await.expect("11:00"),
        DigestOutcome::Delivered {
            alerts: 3,
            recipients_ok: 1,
            recipients_failed: 0
        }
    );
    {
        let sent = outbox.sent.lock().expect("lock");
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].body,
            "cpu-percent-core_1\n\
             2024-03-01 10:50:00, 95, 80\n\
             2024-03-01 10:20:00, 92.5, 80\n\
             2024-03-01 10:05:00, 91, 80\n"
        );
    }

    clock.set(12, 0);
    assert_eq!(digest.fire().await.expect("12:00"), DigestOutcome::Empty);
    assert_eq!(outbox.sent.lock().expect("lock").len(), 1);
}
