use std::sync::{Mutex, RwLock};

use crate::domain::entities::alert::{AlertEntry, AlertEvent, AlertGroups, AlertId};
use crate::domain::entities::metric_tree::Snapshot;
use crate::domain::entities::subscription::{EmailSubscription, MailRelayConfig};
use crate::domain::entities::threshold::{ThresholdConfig, ThresholdPatch, DEFAULT_RATIO_LIMIT};
use crate::domain::ports::store::{
    AlertStore, MetricsStore, StoreError, SubscriptionStore, ThresholdStore,
};
use crate::domain::value_objects::window::AlertWindow;

/// In-memory store for testing purposes.
pub struct InMemoryStore {
    snapshots: Mutex<Vec<Snapshot>>,
    thresholds: RwLock<Option<ThresholdConfig>>,
    alerts: Mutex<Vec<(AlertId, AlertEvent)>>,
    subscriptions: Mutex<Vec<EmailSubscription>>,
    relay: Mutex<Option<MailRelayConfig>>,
    ratio_limit: f64,
}

impl InMemoryStore {
    #[must_use]
    pub const fn new() -> Self {
        Self::with_ratio_limit(DEFAULT_RATIO_LIMIT)
    }

    #[must_use]
    pub const fn with_ratio_limit(ratio_limit: f64) -> Self {
        Self {
            snapshots: Mutex::new(Vec::new()),
            thresholds: RwLock::new(None),
            alerts: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(Vec::new()),
            relay: Mutex::new(None),
            ratio_limit,
        }
    }

    /// Number of snapshots appended so far.
    #[must_use]
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.lock().map_or(0, |s| s.len())
    }

    /// Every stored alert in insertion order, sent or not.
    #[must_use]
    pub fn alert_events(&self) -> Vec<AlertEvent> {
        self.alerts
            .lock()
            .map(|rows| rows.iter().map(|(_, event)| event.clone()).collect())
            .unwrap_or_default()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsStore for InMemoryStore {
    fn append(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.snapshots
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?
            .push(snapshot.clone());
        Ok(())
    }
}

impl ThresholdStore for InMemoryStore {
    fn bootstrap_if_absent(&self, shape: &Snapshot) -> Result<bool, StoreError> {
        let mut config = self
            .thresholds
            .write()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        if config
            .as_ref()
            .is_some_and(|existing| existing.shape_mismatch(shape).is_none())
        {
            return Ok(false);
        }
        *config = Some(ThresholdConfig::from_shape(shape, self.ratio_limit));
        Ok(true)
    }

    fn get(&self) -> Result<Option<ThresholdConfig>, StoreError> {
        Ok(self
            .thresholds
            .read()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?
            .clone())
    }

    fn patch(&self, patch: &ThresholdPatch) -> Result<usize, StoreError> {
        let mut guard = self
            .thresholds
            .write()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        let config = guard
            .as_mut()
            .ok_or_else(|| StoreError::NotFound("threshold config".into()))?;
        Ok(config.apply(patch))
    }

    fn extend_with_defaults(&self, shape: &Snapshot) -> Result<usize, StoreError> {
        let mut guard = self
            .thresholds
            .write()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        let config = guard
            .as_mut()
            .ok_or_else(|| StoreError::NotFound("threshold config".into()))?;
        Ok(config.extend_from(shape, self.ratio_limit))
    }
}

impl AlertStore for InMemoryStore {
    fn append(&self, events: &[AlertEvent]) -> Result<(), StoreError> {
        let mut rows = self
            .alerts
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        let mut next_id = rows.last().map_or(1, |(id, _)| id + 1);
        for event in events {
            rows.push((next_id, event.clone()));
            next_id += 1;
        }
        Ok(())
    }

    fn grouped_unsent(&self, window: &AlertWindow) -> Result<AlertGroups, StoreError> {
        let rows = self
            .alerts
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?;
        let mut visible: Vec<(String, AlertEntry)> = rows
            .iter()
            .filter(|(id, event)| !event.sent && window.admits(*id, event.timestamp))
            .map(|(id, event)| {
                (
                    event.component.clone(),
                    AlertEntry {
                        id: *id,
                        timestamp: event.timestamp,
                        value: event.value,
                        threshold: event.threshold,
                    },
                )
            })
            .collect();
        visible.sort_by(|(_, a), (_, b)| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(AlertGroups::from_rows(visible))
    }

    fn mark_sent_in_window(&self, window: &AlertWindow) -> Result<usize, StoreError> {
        let mut rows = self
            .alerts
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        let mut changed = 0;
        for (id, event) in rows.iter_mut() {
            if !event.sent && window.admits(*id, event.timestamp) {
                event.sent = true;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

impl SubscriptionStore for InMemoryStore {
    fn add_subscription(&self, subscription: &EmailSubscription) -> Result<bool, StoreError> {
        let mut subs = self
            .subscriptions
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        if subs.contains(subscription) {
            return Ok(false);
        }
        subs.push(subscription.clone());
        Ok(true)
    }

    fn subscriptions(&self) -> Result<Vec<EmailSubscription>, StoreError> {
        Ok(self
            .subscriptions
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?
            .clone())
    }

    fn upsert_relay(&self, relay: &MailRelayConfig) -> Result<(), StoreError> {
        *self
            .relay
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))? = Some(relay.clone());
        Ok(())
    }

    fn relay(&self) -> Result<Option<MailRelayConfig>, StoreError> {
        Ok(self
            .relay
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?
            .clone())
    }
}
