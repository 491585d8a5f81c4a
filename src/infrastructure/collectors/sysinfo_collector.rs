use std::sync::Mutex;

use sysinfo::System;

use super::disk_collector::DiskCollector;
use super::procfs::{parse_diskstats, parse_proc_stat_times, CoreTimes, DiskIo, ProcRoot};
use crate::domain::entities::metric_tree::{MetricMap, MetricNode, Snapshot};
use crate::domain::ports::collector::{CollectionError, MetricsSampler};

/// Returns `(numerator / denominator) * 100.0`, or `0.0` when `denominator` is zero.
#[allow(clippy::cast_precision_loss)]
fn safe_percent(numerator: u64, denominator: u64) -> f64 {
    if denominator > 0 {
        (numerator as f64 / denominator as f64) * 100.0
    } else {
        0.0
    }
}

#[allow(clippy::cast_precision_loss)]
fn bytes(value: u64) -> MetricNode {
    MetricNode::Value(value as f64)
}

fn core_key(index: usize) -> String {
    format!("core_{}", index + 1)
}

/// Samples the host into the `cpu`, `memory`, `swap_memory`, `disk_usage`
/// and `io` categories.
///
/// Uses `Mutex<System>` for interior mutability since `MetricsSampler`
/// takes `&self` but `sysinfo::System` needs `&mut self` for refresh. CPU
/// usage is measured between consecutive samples.
pub struct SysinfoSampler {
    sys: Mutex<System>,
    disk_collector: DiskCollector,
    proc_root: ProcRoot,
}

impl SysinfoSampler {
    #[must_use]
    pub fn new() -> Self {
        Self::with_proc_root(ProcRoot::default())
    }

    /// Sampler reading `stat` and `diskstats` below `proc_root`.
    #[must_use]
    pub fn with_proc_root(proc_root: ProcRoot) -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        sys.refresh_memory();
        Self {
            sys: Mutex::new(sys),
            disk_collector: DiskCollector::new(),
            proc_root,
        }
    }

    fn read_proc(&self, name: &str) -> Option<String> {
        let path = self.proc_root.file(name);
        match std::fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) => {
                tracing::debug!(path = %path.display(), "Counter file unreadable, branch omitted: {e}");
                None
            }
        }
    }
}

impl Default for SysinfoSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSampler for SysinfoSampler {
    fn sample(&self) -> Result<Snapshot, CollectionError> {
        let mut sys = self.sys.lock().map_err(|e| {
            CollectionError::MetricsUnavailable(format!("system lock poisoned: {e}"))
        })?;
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        let usage: Vec<f32> = sys.cpus().iter().map(sysinfo::Cpu::cpu_usage).collect();
        let memory = memory_branch(&sys);
        let swap = swap_branch(&sys);
        drop(sys);

        let times = self
            .read_proc("stat")
            .map(|content| parse_proc_stat_times(&content))
            .unwrap_or_default();

        let mut snapshot = Snapshot::new(chrono::Utc::now());
        snapshot.insert_category("cpu", cpu_branch(&times, &usage));
        snapshot.insert_category("memory", memory);
        snapshot.insert_category("swap_memory", swap);

        match self.disk_collector.collect() {
            Ok(disks) => snapshot.insert_category("disk_usage", disks),
            Err(e) => tracing::warn!("Disk usage omitted: {e}"),
        }

        if let Some(content) = self.read_proc("diskstats") {
            snapshot.insert_category("io", io_branch(&parse_diskstats(&content)));
        }

        Ok(snapshot)
    }
}

/// Per-core times (when readable) followed by per-core usage.
fn cpu_branch(times: &[CoreTimes], usage: &[f32]) -> MetricMap {
    let mut cpu = MetricMap::new();
    if !times.is_empty() {
        let column = |pick: fn(&CoreTimes) -> f64| -> MetricNode {
            MetricNode::Branch(
                times
                    .iter()
                    .enumerate()
                    .map(|(i, t)| (core_key(i), MetricNode::Value(pick(t))))
                    .collect(),
            )
        };
        cpu.insert("user_time".into(), column(|t| t.user));
        cpu.insert("system_time".into(), column(|t| t.system));
        cpu.insert("idle_time".into(), column(|t| t.idle));
    }
    cpu.insert(
        "percent".into(),
        MetricNode::Branch(
            usage
                .iter()
                .enumerate()
                .map(|(i, u)| (core_key(i), MetricNode::Value(f64::from(*u))))
                .collect(),
        ),
    );
    cpu
}

fn memory_branch(sys: &System) -> MetricMap {
    let total = sys.total_memory();
    let available = sys.available_memory();

    let mut memory = MetricMap::new();
    memory.insert("available_memory".into(), bytes(available));
    memory.insert(
        "memory_percent_usage".into(),
        MetricNode::Value(safe_percent(total.saturating_sub(available), total)),
    );
    memory.insert("used_memory".into(), bytes(sys.used_memory()));
    memory
}

fn swap_branch(sys: &System) -> MetricMap {
    let total = sys.total_swap();
    let used = sys.used_swap();

    let mut swap = MetricMap::new();
    swap.insert("used_memory".into(), bytes(used));
    swap.insert("free_memory".into(), bytes(sys.free_swap()));
    swap.insert("percent_usage".into(), MetricNode::Value(safe_percent(used, total)));
    swap
}

fn io_branch(disks: &[DiskIo]) -> MetricMap {
    disks
        .iter()
        .map(|disk| {
            let mut counters = MetricMap::new();
            counters.insert("read_count".into(), bytes(disk.read_count));
            counters.insert("write_count".into(), bytes(disk.write_count));
            counters.insert("read_bytes".into(), bytes(disk.read_bytes));
            counters.insert("write_bytes".into(), bytes(disk.write_bytes));
            counters.insert("read_time".into(), bytes(disk.read_time));
            counters.insert("write_time".into(), bytes(disk.write_time));
            (disk.device.clone(), MetricNode::Branch(counters))
        })
        .collect()
}
