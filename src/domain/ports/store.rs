use thiserror::Error;

use crate::domain::entities::alert::{AlertEvent, AlertGroups};
use crate::domain::entities::metric_tree::Snapshot;
use crate::domain::entities::subscription::{EmailSubscription, MailRelayConfig};
use crate::domain::entities::threshold::{ThresholdConfig, ThresholdPatch};
use crate::domain::value_objects::window::AlertWindow;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage read failed: {0}")]
    ReadFailed(String),
    #[error("storage write failed: {0}")]
    WriteFailed(String),
    #[error("entry not found: {0}")]
    NotFound(String),
    #[error("stored config is corrupt: {0}")]
    ConfigCorrupt(String),
}

/// Append-only history of samples, queried elsewhere for aggregates.
pub trait MetricsStore: Send + Sync {
    /// Persist every numeric leaf of a snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write operation fails.
    fn append(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
}

/// Persisted per-leaf thresholds.
///
/// Reads observe a whole document; concurrent patches never yield a
/// half-merged tree to a reader.
pub trait ThresholdStore: Send + Sync {
    /// Create the config from `shape` unless one already exists.
    ///
    /// A corrupt document counts as absent, as does one whose shape clashes
    /// with `shape`. Returns `true` when a new config was written.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the document cannot be read or written.
    fn bootstrap_if_absent(&self, shape: &Snapshot) -> Result<bool, StoreError>;

    /// Current config, `None` before bootstrap.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the document cannot be read.
    fn get(&self) -> Result<Option<ThresholdConfig>, StoreError>;

    /// Merge `patch` into the stored config. Returns the number of leaves applied.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` before bootstrap, or another
    /// `StoreError` if the document cannot be read or written.
    fn patch(&self, patch: &ThresholdPatch) -> Result<usize, StoreError>;

    /// Add default thresholds for branches of `shape` the config lacks.
    /// Returns the number of leaves added.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` before bootstrap, or another
    /// `StoreError` if the document cannot be read or written.
    fn extend_with_defaults(&self, shape: &Snapshot) -> Result<usize, StoreError>;
}

pub trait AlertStore: Send + Sync {
    /// Persist a batch of alerts atomically.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write operation fails.
    fn append(&self, events: &[AlertEvent]) -> Result<(), StoreError>;

    /// Unsent alerts inside `window`, grouped by component.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the read operation fails.
    fn grouped_unsent(&self, window: &AlertWindow) -> Result<AlertGroups, StoreError>;

    /// Flag every unsent alert inside `window` as sent. Returns the number of rows changed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write operation fails.
    fn mark_sent_in_window(&self, window: &AlertWindow) -> Result<usize, StoreError>;
}

pub trait SubscriptionStore: Send + Sync {
    /// Register an address. Returns `false` if it was already subscribed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write operation fails.
    fn add_subscription(&self, subscription: &EmailSubscription) -> Result<bool, StoreError>;

    /// All subscribed addresses in registration order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the read operation fails.
    fn subscriptions(&self) -> Result<Vec<EmailSubscription>, StoreError>;

    /// Replace the relay credentials.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write operation fails.
    fn upsert_relay(&self, relay: &MailRelayConfig) -> Result<(), StoreError>;

    /// Current relay credentials, if configured.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the read operation fails.
    fn relay(&self) -> Result<Option<MailRelayConfig>, StoreError>;
}
