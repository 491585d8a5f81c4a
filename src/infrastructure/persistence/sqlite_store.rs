use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::entities::alert::{AlertEntry, AlertEvent, AlertGroups};
use crate::domain::entities::metric_tree::Snapshot;
use crate::domain::entities::subscription::{EmailSubscription, MailRelayConfig};
use crate::domain::ports::store::{AlertStore, MetricsStore, StoreError, SubscriptionStore};
use crate::domain::tree::join_path;
use crate::domain::value_objects::window::AlertWindow;

use super::migrations;

/// SQLite-backed persistent store for samples, alerts and digest recipients.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create a new `SQLite` store at the given path.
    ///
    /// Expands `~`, creates parent directories, opens connection,
    /// sets WAL mode and pragmas, and initializes schema.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::WriteFailed` if the database cannot be opened or initialized.
    pub fn new(path: &str) -> Result<Self, StoreError> {
        let expanded = shellexpand::tilde(path);
        let db_path = PathBuf::from(expanded.as_ref());

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        }

        let conn =
            Connection::open(&db_path).map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        migrations::initialize_schema(&conn).map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

// Fixed-width UTC text so lexical order matches time order in range queries.
fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(raw: &str, column: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_alert_row(row: &rusqlite::Row<'_>) -> Result<(String, AlertEntry), rusqlite::Error> {
    let id: i64 = row.get(0)?;
    let created_at: String = row.get(1)?;
    let component: String = row.get(2)?;
    let value: f64 = row.get(3)?;
    let threshold: f64 = row.get(4)?;

    Ok((
        component,
        AlertEntry {
            id,
            timestamp: decode_timestamp(&created_at, 1)?,
            value,
            threshold,
        },
    ))
}

impl MetricsStore for SqliteStore {
    fn append(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let data = serde_json::to_string(&snapshot.metrics)
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        let captured_at = encode_timestamp(snapshot.timestamp);

        let mut conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        let tx = conn
            .transaction()
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        tx.execute(
            "INSERT INTO snapshots (captured_at, data) VALUES (?1, ?2)",
            params![captured_at, data],
        )
        .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO metric_samples (captured_at, family, path, value)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
            for (path, value) in snapshot.values() {
                let family = path.first().copied().unwrap_or_default();
                stmt.execute(params![captured_at, family, join_path(&path), value])
                    .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
            }
        }

        tx.commit()
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        drop(conn);
        Ok(())
    }
}

impl AlertStore for SqliteStore {
    fn append(&self, events: &[AlertEvent]) -> Result<(), StoreError> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        let tx = conn
            .transaction()
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO alerts (created_at, component, value, threshold, sent)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
            for event in events {
                stmt.execute(params![
                    encode_timestamp(event.timestamp),
                    event.component,
                    event.value,
                    event.threshold,
                    event.sent,
                ])
                .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
            }
        }

        tx.commit()
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        drop(conn);
        Ok(())
    }

    fn grouped_unsent(&self, window: &AlertWindow) -> Result<AlertGroups, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?;

        let mut stmt = conn
            .prepare(
                "SELECT id, created_at, component, value, threshold FROM alerts
                 WHERE sent = 0 AND created_at >= ?1 AND created_at < ?2
                   AND (?3 IS NULL OR id <= ?3)
                 ORDER BY created_at ASC, id ASC",
            )
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;

        let rows = stmt
            .query_map(
                params![
                    encode_timestamp(window.start),
                    encode_timestamp(window.end),
                    window.through,
                ],
                parse_alert_row,
            )
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;

        Ok(AlertGroups::from_rows(rows))
    }

    fn mark_sent_in_window(&self, window: &AlertWindow) -> Result<usize, StoreError> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        let tx = conn
            .transaction()
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        let changed = tx
            .execute(
                "UPDATE alerts SET sent = 1
                 WHERE sent = 0 AND created_at >= ?1 AND created_at < ?2
                   AND (?3 IS NULL OR id <= ?3)",
                params![
                    encode_timestamp(window.start),
                    encode_timestamp(window.end),
                    window.through,
                ],
            )
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        tx.commit()
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        drop(conn);
        Ok(changed)
    }
}

impl SubscriptionStore for SqliteStore {
    fn add_subscription(&self, subscription: &EmailSubscription) -> Result<bool, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO email_subscriptions (email) VALUES (?1)",
                params![subscription.email],
            )
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        drop(conn);
        Ok(inserted == 1)
    }

    fn subscriptions(&self) -> Result<Vec<EmailSubscription>, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?;
        let mut stmt = conn
            .prepare("SELECT email FROM email_subscriptions ORDER BY id ASC")
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;
        let subs = stmt
            .query_map([], |row| Ok(EmailSubscription { email: row.get(0)? }))
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;
        Ok(subs)
    }

    fn upsert_relay(&self, relay: &MailRelayConfig) -> Result<(), StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        conn.execute(
            "INSERT INTO mail_relay (id, sender, credential) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET sender = excluded.sender, credential = excluded.credential",
            params![relay.sender, relay.credential],
        )
        .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        drop(conn);
        Ok(())
    }

    fn relay(&self) -> Result<Option<MailRelayConfig>, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?;
        conn.query_row(
            "SELECT sender, credential FROM mail_relay WHERE id = 1",
            [],
            |row| {
                Ok(MailRelayConfig {
                    sender: row.get(0)?,
                    credential: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(|e| StoreError::ReadFailed(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn make_store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("test.db");
        let store = SqliteStore::new(path.to_str().expect("path")).expect("store");
        (store, dir)
    }

    fn ts(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, minute, 0)
            .single()
            .expect("valid time")
    }

    fn alert(hour: u32, minute: u32, component: &str) -> AlertEvent {
        AlertEvent::new(ts(hour, minute), component.into(), 95.0, 80.0)
    }

    fn hour_window() -> AlertWindow {
        AlertWindow::new(ts(10, 0), ts(11, 0))
    }

    #[test]
    fn new_creates_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("test.db");
        let result = SqliteStore::new(path.to_str().expect("path"));
        assert!(result.is_ok());
        assert!(path.exists());
    }

    #[test]
    fn append_snapshot_writes_every_numeric_leaf() {
        let (store, _dir) = make_store();
        let snapshot = Snapshot::from_json(
            ts(10, 0),
            json!({
                "cpu": { "percent": { "core_1": 12.5, "core_2": 30.0 } },
                "disk_usage": { "sda1": { "mountpoint": "/", "percent": 40.0 } }
            }),
        )
        .expect("snapshot");
        MetricsStore::append(&store, &snapshot).expect("append");

        let conn = store.conn.lock().expect("lock");
        let snapshots: i64 = conn
            .query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))
            .expect("count");
        assert_eq!(snapshots, 1);

        let mut stmt = conn
            .prepare("SELECT family, path, value FROM metric_samples ORDER BY id")
            .expect("prepare");
        let samples: Vec<(String, String, f64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .expect("query")
            .collect::<Result<_, _>>()
            .expect("rows");
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].0, "cpu");
        assert_eq!(samples[0].1, "cpu-percent-core_1");
        assert_eq!(samples[2].1, "disk_usage-sda1-percent");
    }

    #[test]
    fn grouped_unsent_orders_groups_and_entries() {
        let (store, _dir) = make_store();
        AlertStore::append(
            &store,
            &[
                alert(10, 5, "cpu-percent-core_1"),
                alert(10, 10, "memory-memory_percent_usage"),
                alert(10, 20, "cpu-percent-core_1"),
                alert(10, 50, "cpu-percent-core_1"),
            ],
        )
        .expect("append");

        let groups = store.grouped_unsent(&hour_window()).expect("grouped");
        let components: Vec<&str> = groups.iter().map(|(c, _)| c).collect();
        assert_eq!(
            components,
            vec!["cpu-percent-core_1", "memory-memory_percent_usage"]
        );

        let cpu = groups.get("cpu-percent-core_1").expect("cpu group");
        let times: Vec<DateTime<Utc>> = cpu.iter().map(|e| e.timestamp).collect();
        assert_eq!(times, vec![ts(10, 50), ts(10, 20), ts(10, 5)]);
    }

    #[test]
    fn window_is_half_open() {
        let (store, _dir) = make_store();
        AlertStore::append(&store, &[alert(10, 0, "a"), alert(11, 0, "b")]).expect("append");

        let groups = store.grouped_unsent(&hour_window()).expect("grouped");
        assert!(groups.get("a").is_some());
        assert!(groups.get("b").is_none());
    }

    #[test]
    fn mark_sent_empties_the_window() {
        let (store, _dir) = make_store();
        AlertStore::append(&store, &[alert(10, 5, "a"), alert(10, 6, "a"), alert(11, 30, "a")])
            .expect("append");

        assert_eq!(store.mark_sent_in_window(&hour_window()).expect("mark"), 2);
        assert!(store.grouped_unsent(&hour_window()).expect("grouped").is_empty());

        let later = AlertWindow::new(ts(11, 0), ts(12, 0));
        assert_eq!(store.grouped_unsent(&later).expect("grouped").alert_count(), 1);
    }

    #[test]
    fn mark_sent_leaves_rows_appended_after_the_read() {
        let (store, _dir) = make_store();
        AlertStore::append(&store, &[alert(10, 5, "a")]).expect("append");
        let groups = store.grouped_unsent(&hour_window()).expect("grouped");
        let through = groups.high_water_mark().expect("one row");

        AlertStore::append(&store, &[alert(10, 30, "a")]).expect("late append");
        let changed = store
            .mark_sent_in_window(&hour_window().through(through))
            .expect("mark");
        assert_eq!(changed, 1);

        let remaining = store.grouped_unsent(&hour_window()).expect("grouped");
        assert_eq!(remaining.alert_count(), 1);
        assert_eq!(
            remaining.get("a").expect("group")[0].timestamp,
            ts(10, 30)
        );
    }

    #[test]
    fn subscriptions_are_unique_and_ordered() {
        let (store, _dir) = make_store();
        let a = EmailSubscription::parse("a@example.com").expect("valid");
        let b = EmailSubscription::parse("b@example.com").expect("valid");
        assert!(store.add_subscription(&b).expect("add"));
        assert!(store.add_subscription(&a).expect("add"));
        assert!(!store.add_subscription(&b).expect("add duplicate"));

        let emails: Vec<String> = store
            .subscriptions()
            .expect("list")
            .into_iter()
            .map(|s| s.email)
            .collect();
        assert_eq!(emails, vec!["b@example.com", "a@example.com"]);
    }

    #[test]
    fn relay_is_upserted_as_single_record() {
        let (store, _dir) = make_store();
        assert!(store.relay().expect("relay").is_none());

        store
            .upsert_relay(&MailRelayConfig {
                sender: "one@example.com".into(),
                credential: "first".into(),
            })
            .expect("insert");
        store
            .upsert_relay(&MailRelayConfig {
                sender: "two@example.com".into(),
                credential: "second".into(),
            })
            .expect("update");

        let relay = store.relay().expect("relay").expect("configured");
        assert_eq!(relay.sender, "two@example.com");
        assert_eq!(relay.credential, "second");
    }

    #[test]
    fn poisoned_mutex_returns_error() {
        let (store, _dir) = make_store();
        let store = std::sync::Arc::new(store);
        let clone = std::sync::Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = clone.conn.lock().expect("lock");
            panic!("poison");
        })
        .join();

        let result = store.subscriptions();
        assert!(matches!(result, Err(StoreError::ReadFailed(_))));
    }
}
