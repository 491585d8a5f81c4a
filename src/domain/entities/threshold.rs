use std::fmt;

use indexmap::IndexMap;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::metric_tree::{MetricNode, Snapshot};
use crate::domain::tree::{find_kind_mismatch, graft_missing, map_leaves, zip_leaves_mut, Tree};

/// Default limit applied to ratio leaves when a config is bootstrapped.
pub const DEFAULT_RATIO_LIMIT: f64 = 80.0;

/// Ordered map of named threshold nodes.
pub type ThresholdMap = IndexMap<String, ThresholdNode>;

/// One node of a threshold tree.
///
/// Serialized as a number (`Limit`), an empty string (`Disabled`) or an
/// object (`Branch`), which is also the on-disk document format.
#[derive(Debug, Clone, PartialEq)]
pub enum ThresholdNode {
    Limit(f64),
    Disabled,
    Branch(ThresholdMap),
}

impl ThresholdNode {
    #[must_use]
    pub const fn limit(&self) -> Option<f64> {
        match self {
            Self::Limit(v) => Some(*v),
            _ => None,
        }
    }

    const fn is_leaf(&self) -> bool {
        !matches!(self, Self::Branch(_))
    }
}

impl Tree for ThresholdNode {
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

impl Serialize for ThresholdNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Limit(v) => serializer.serialize_f64(*v),
            Self::Disabled => serializer.serialize_str(""),
            Self::Branch(children) => {
                let mut map = serializer.serialize_map(Some(children.len()))?;
                for (key, node) in children {
                    map.serialize_entry(key, node)?;
                }
                map.end()
            }
        }
    }
}

struct ThresholdNodeVisitor;

impl<'de> Visitor<'de> for ThresholdNodeVisitor {
    type Value = ThresholdNode;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number, an empty string or an object")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(ThresholdNode::Limit(v))
    }

    #[allow(clippy::cast_precision_loss)]
    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(ThresholdNode::Limit(v as f64))
    }

    #[allow(clippy::cast_precision_loss)]
    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(ThresholdNode::Limit(v as f64))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        if v.is_empty() {
            Ok(ThresholdNode::Disabled)
        } else {
            Err(E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }

    fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Self::Value, M::Error> {
        let mut children = ThresholdMap::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, node)) = access.next_entry::<String, ThresholdNode>()? {
            children.insert(key, node);
        }
        Ok(ThresholdNode::Branch(children))
    }
}

impl<'de> Deserialize<'de> for ThresholdNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ThresholdNodeVisitor)
    }
}

/// Whether a leaf at `path` is measured on a 0-100 scale.
///
/// Any path segment mentioning `percent` qualifies, so both
/// `memory.memory_percent_usage` and `cpu.percent.core_1` are ratio leaves.
#[must_use]
pub fn is_ratio_path(path: &[&str]) -> bool {
    path.iter().any(|segment| segment.contains("percent"))
}

fn default_for(path: &[&str], node: &MetricNode, ratio_limit: f64) -> Option<ThresholdNode> {
    match node {
        MetricNode::Value(_) if is_ratio_path(path) => Some(ThresholdNode::Limit(ratio_limit)),
        MetricNode::Value(_) => Some(ThresholdNode::Disabled),
        MetricNode::Label(_) | MetricNode::Branch(_) => None,
    }
}

/// Per-leaf alert thresholds, shaped like the snapshot they were derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdConfig {
    pub root: ThresholdMap,
}

impl ThresholdConfig {
    /// Derive a config leaf-for-leaf from a snapshot: ratio leaves get
    /// `ratio_limit`, absolute leaves are disabled, labels are not configured.
    #[must_use]
    pub fn from_shape(shape: &Snapshot, ratio_limit: f64) -> Self {
        Self {
            root: map_leaves(&shape.metrics, &mut |path, node| {
                default_for(path, node, ratio_limit)
            }),
        }
    }

    /// Look up the node at `path`.
    #[must_use]
    pub fn get(&self, path: &[&str]) -> Option<&ThresholdNode> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.root.get(*first)?, |node, key| node.children()?.get(*key))
    }

    /// Merge `patch` into this config leaf by leaf.
    ///
    /// Only leaves that already exist are overwritten; branches unknown to
    /// this config, and leaf/branch mismatches, are ignored. Returns the
    /// number of leaves applied.
    pub fn apply(&mut self, patch: &ThresholdPatch) -> usize {
        let mut applied = 0;
        zip_leaves_mut(&mut self.root, &patch.root, &mut |_, target, change| {
            if target.is_leaf() && change.is_leaf() {
                *target = change.clone();
                applied += 1;
            }
        });
        applied
    }

    /// Add defaults for branches and leaves present in `shape` but missing
    /// here. Existing leaves keep their values. Returns the number added.
    pub fn extend_from(&mut self, shape: &Snapshot, ratio_limit: f64) -> usize {
        graft_missing(&mut self.root, &shape.metrics, &mut |path, node| {
            default_for(path, node, ratio_limit)
        })
    }

    /// Why this config cannot be evaluated against `shape`, if it cannot.
    ///
    /// An empty document for a non-empty shape, or a shared key that is a
    /// leaf on one side and a branch on the other, disqualifies it.
    #[must_use]
    pub fn shape_mismatch(&self, shape: &Snapshot) -> Option<String> {
        if self.root.is_empty() && !shape.metrics.is_empty() {
            return Some("document is empty".into());
        }
        find_kind_mismatch(&self.root, &shape.metrics)
            .map(|path| format!("`{path}` does not match the sampled shape"))
    }
}

/// Partial threshold tree supplied by an operator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdPatch {
    pub root: ThresholdMap,
}

impl ThresholdPatch {
    /// Parse a change set leniently.
    ///
    /// Numbers become limits, `""` disables a leaf, objects recurse. Every
    /// other value (booleans, `null`, non-empty strings, arrays) is dropped.
    /// A non-object root yields an empty patch.
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(map) => Self {
                root: lenient_branch(map),
            },
            _ => Self::default(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

fn lenient_branch(map: &serde_json::Map<String, serde_json::Value>) -> ThresholdMap {
    map.iter()
        .filter_map(|(key, value)| lenient_node(value).map(|node| (key.clone(), node)))
        .collect()
}

fn lenient_node(value: &serde_json::Value) -> Option<ThresholdNode> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().map(ThresholdNode::Limit),
        serde_json::Value::String(s) if s.is_empty() => Some(ThresholdNode::Disabled),
        serde_json::Value::Object(map) => Some(ThresholdNode::Branch(lenient_branch(map))),
        _ => None,
    }
}
