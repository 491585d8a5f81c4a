use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Row identifier assigned by the alert store.
pub type AlertId = i64;

/// A single threshold breach observed during one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub timestamp: DateTime<Utc>,
    /// Leaf path joined with `-`, e.g. `cpu-percent-core_1`.
    pub component: String,
    pub value: f64,
    pub threshold: f64,
    pub sent: bool,
}

impl AlertEvent {
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, component: String, value: f64, threshold: f64) -> Self {
        Self {
            timestamp,
            component,
            value,
            threshold,
            sent: false,
        }
    }
}

/// A stored, not yet digested alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEntry {
    pub id: AlertId,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub threshold: f64,
}

/// Unsent alerts grouped by component.
///
/// Components keep first-seen order; entries within a component are newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlertGroups {
    groups: IndexMap<String, Vec<AlertEntry>>,
}

impl AlertGroups {
    /// Group rows given in ascending timestamp order.
    pub fn from_rows(rows: impl IntoIterator<Item = (String, AlertEntry)>) -> Self {
        let mut groups: IndexMap<String, Vec<AlertEntry>> = IndexMap::new();
        for (component, entry) in rows {
            groups.entry(component).or_default().push(entry);
        }
        for entries in groups.values_mut() {
            entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        }
        Self { groups }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of components with at least one alert.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.groups.len()
    }

    /// Total number of alerts across all components.
    #[must_use]
    pub fn alert_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Highest row id included, used to bound the matching mark-sent update.
    #[must_use]
    pub fn high_water_mark(&self) -> Option<AlertId> {
        self.groups.values().flatten().map(|e| e.id).max()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[AlertEntry])> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    #[must_use]
    pub fn get(&self, component: &str) -> Option<&[AlertEntry]> {
        self.groups.get(component).map(Vec::as_slice)
    }
}
