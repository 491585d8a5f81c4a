use std::collections::HashSet;
use std::sync::Mutex;

use sysinfo::Disks;

use crate::domain::entities::metric_tree::{MetricMap, MetricNode};
use crate::domain::ports::collector::CollectionError;

/// Filesystem types to exclude from disk metrics.
const PSEUDO_FILESYSTEMS: &[&str] = &[
    "tmpfs",
    "devtmpfs",
    "sysfs",
    "proc",
    "cgroup2",
    "overlay",
    "squashfs",
    "efivarfs",
    "bpf",
    "hugetlbfs",
    "mqueue",
    "pstore",
    "securityfs",
    "debugfs",
    "tracefs",
    "fusectl",
    "rpc_pipefs",
];

/// Space accounting for one mounted partition, in bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionUsage {
    pub device: String,
    pub mountpoint: String,
    pub fstype: String,
    pub total: u64,
    pub available: u64,
}

/// Collects per-partition usage using the `sysinfo` crate.
pub struct DiskCollector {
    disks: Mutex<Disks>,
}

impl DiskCollector {
    /// Creates a new collector with a pre-refreshed disk list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            disks: Mutex::new(Disks::new_with_refreshed_list()),
        }
    }

    /// Build the `disk_usage` branch.
    ///
    /// Refreshes the disk list to pick up newly mounted/unmounted volumes.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::MetricsUnavailable` if the internal mutex is poisoned.
    pub fn collect(&self) -> Result<MetricMap, CollectionError> {
        let mut disks = self
            .disks
            .lock()
            .map_err(|e| CollectionError::MetricsUnavailable(format!("disk lock poisoned: {e}")))?;
        disks.refresh_list();

        let partitions: Vec<PartitionUsage> = disks
            .iter()
            .map(|disk| PartitionUsage {
                device: disk.name().to_string_lossy().to_string(),
                mountpoint: disk.mount_point().to_string_lossy().to_string(),
                fstype: disk.file_system().to_string_lossy().to_string(),
                total: disk.total_space(),
                available: disk.available_space(),
            })
            .collect();
        drop(disks);

        Ok(usage_branch(partitions))
    }
}

impl Default for DiskCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Keyed by device; pseudo filesystems and zero-size partitions are dropped
/// and a device mounted twice keeps its first mount.
#[allow(clippy::cast_precision_loss)]
pub fn usage_branch(partitions: impl IntoIterator<Item = PartitionUsage>) -> MetricMap {
    let mut seen = HashSet::new();
    let mut branch = MetricMap::new();

    for partition in partitions {
        if PSEUDO_FILESYSTEMS.contains(&partition.fstype.as_str()) || partition.total == 0 {
            continue;
        }
        if !seen.insert(partition.device.clone()) {
            continue;
        }

        let total = partition.total;
        let free = partition.available.min(total);
        let used = total - free;
        let percent = ((used as f64 / total as f64) * 100.0).clamp(0.0, 100.0);

        let mut entry = MetricMap::new();
        entry.insert("mountpoint".into(), MetricNode::Label(partition.mountpoint));
        entry.insert("fstype".into(), MetricNode::Label(partition.fstype));
        entry.insert("total".into(), MetricNode::Value(total as f64));
        entry.insert("used".into(), MetricNode::Value(used as f64));
        entry.insert("free".into(), MetricNode::Value(free as f64));
        entry.insert("percent".into(), MetricNode::Value(percent));
        branch.insert(partition.device, MetricNode::Branch(entry));
    }

    branch
}
