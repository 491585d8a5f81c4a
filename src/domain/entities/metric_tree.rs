use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::domain::tree::{walk_leaves, Tree};

/// Ordered map of named metric nodes.
pub type MetricMap = IndexMap<String, MetricNode>;

/// One node of a sampled metric tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricNode {
    /// Numeric measurement.
    Value(f64),
    /// Descriptive string carried alongside measurements (mount point, fs type).
    Label(String),
    Branch(MetricMap),
}

impl MetricNode {
    #[must_use]
    pub const fn as_value(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<f64> for MetricNode {
    fn from(value: f64) -> Self {
        Self::Value(value)
    }
}

impl From<MetricMap> for MetricNode {
    fn from(children: MetricMap) -> Self {
        Self::Branch(children)
    }
}

impl Tree for MetricNode {
    fn children(&self) -> Option<&IndexMap<String, Self>> {
        match self {
            Self::Branch(children) => Some(children),
            _ => None,
        }
    }

    fn children_mut(&mut self) -> Option<&mut IndexMap<String, Self>> {
        match self {
            Self::Branch(children) => Some(children),
            _ => None,
        }
    }

    fn branch(children: IndexMap<String, Self>) -> Self {
        Self::Branch(children)
    }
}

/// Point-in-time tree of sampled host metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub metrics: MetricMap,
}

impl Snapshot {
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            metrics: MetricMap::new(),
        }
    }

    /// Build a snapshot from a JSON object of categories.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if `metrics` is not an object of numbers,
    /// strings and nested objects.
    pub fn from_json(
        timestamp: DateTime<Utc>,
        metrics: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            timestamp,
            metrics: serde_json::from_value(metrics)?,
        })
    }

    /// Append a top-level category, replacing any previous one with the same name.
    pub fn insert_category(&mut self, name: impl Into<String>, children: MetricMap) {
        self.metrics.insert(name.into(), MetricNode::Branch(children));
    }

    /// Look up the node at `path`.
    #[must_use]
    pub fn get(&self, path: &[&str]) -> Option<&MetricNode> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.metrics.get(*first)?, |node, key| node.children()?.get(*key))
    }

    /// Numeric value at `path`, if that node is a measurement.
    #[must_use]
    pub fn value_at(&self, path: &[&str]) -> Option<f64> {
        self.get(path).and_then(MetricNode::as_value)
    }

    /// Every numeric leaf with its path, in tree order.
    #[must_use]
    pub fn values(&self) -> Vec<(Vec<&str>, f64)> {
        let mut out = Vec::new();
        walk_leaves(&self.metrics, &mut |path, node| {
            if let MetricNode::Value(v) = node {
                out.push((path.to_vec(), *v));
            }
        });
        out
    }

    /// JSON payload pushed to live consumers: the bare category tree.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if a value cannot be represented (non-finite floats
    /// are emitted as `null` by `serde_json`, so this is practically infallible).
    pub fn to_live_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.metrics)
    }
}
