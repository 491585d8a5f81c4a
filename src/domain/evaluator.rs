use chrono::{DateTime, Utc};

use crate::domain::entities::alert::AlertEvent;
use crate::domain::entities::metric_tree::{MetricNode, Snapshot};
use crate::domain::entities::threshold::{ThresholdConfig, ThresholdNode};
use crate::domain::tree::{join_path, zip_leaves};

/// Compare every measured leaf against its configured limit.
///
/// Emits one unsent [`AlertEvent`] per leaf where `value >= limit`, stamped
/// with `at`. Disabled leaves, labels, and leaves without a config entry
/// (branches added after bootstrap) are skipped. Pure: no I/O.
#[must_use]
pub fn evaluate(snapshot: &Snapshot, config: &ThresholdConfig, at: DateTime<Utc>) -> Vec<AlertEvent> {
    let mut alerts = Vec::new();
    zip_leaves(&snapshot.metrics, &config.root, &mut |path, metric, threshold| {
        if let (MetricNode::Value(value), ThresholdNode::Limit(limit)) = (metric, threshold) {
            if *value >= *limit {
                alerts.push(AlertEvent::new(at, join_path(path), *value, *limit));
            }
        }
    });
    alerts
}
