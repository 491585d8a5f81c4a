//! Parsers for the `/proc` files sysinfo does not expose per core or per device.

use std::path::PathBuf;

/// Kernel clock ticks per second (`USER_HZ`), fixed at 100 on Linux.
const CLOCK_TICKS_PER_SEC: f64 = 100.0;

const SECTOR_SIZE: u64 = 512;

/// Devices that never back real storage.
const VIRTUAL_BLOCK_PREFIXES: &[&str] = &["loop", "ram", "zram"];

/// Cumulative CPU time of one core, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoreTimes {
    pub user: f64,
    pub system: f64,
    pub idle: f64,
}

/// Cumulative I/O counters of one block device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskIo {
    pub device: String,
    pub read_count: u64,
    pub write_count: u64,
    pub read_bytes: u64,
    pub write_bytes: u64,
    /// Milliseconds spent reading.
    pub read_time: u64,
    /// Milliseconds spent writing.
    pub write_time: u64,
}

/// Location of the proc filesystem, overridable for tests.
#[derive(Debug, Clone)]
pub struct ProcRoot(PathBuf);

impl ProcRoot {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self(root.into())
    }

    #[must_use]
    pub fn file(&self, name: &str) -> PathBuf {
        self.0.join(name)
    }
}

impl Default for ProcRoot {
    fn default() -> Self {
        Self::new("/proc")
    }
}

/// Per-core times from `/proc/stat`, in core order. The aggregate `cpu` line is skipped.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn parse_proc_stat_times(content: &str) -> Vec<CoreTimes> {
    content
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            let label = parts.first()?;
            let index = label.strip_prefix("cpu")?;
            if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) || parts.len() < 5 {
                return None;
            }

            let get_val =
                |idx: usize| -> u64 { parts.get(idx).and_then(|s| s.parse().ok()).unwrap_or(0) };
            // user nice system idle ...
            Some(CoreTimes {
                user: get_val(1) as f64 / CLOCK_TICKS_PER_SEC,
                system: get_val(3) as f64 / CLOCK_TICKS_PER_SEC,
                idle: get_val(4) as f64 / CLOCK_TICKS_PER_SEC,
            })
        })
        .collect()
}

/// Block device counters from `/proc/diskstats`, skipping virtual devices.
#[must_use]
pub fn parse_diskstats(content: &str) -> Vec<DiskIo> {
    let mut disks = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 14 {
            continue;
        }
        let device = parts[2];
        if VIRTUAL_BLOCK_PREFIXES
            .iter()
            .any(|prefix| device.starts_with(prefix))
        {
            continue;
        }

        let get_val =
            |idx: usize| -> u64 { parts.get(idx).and_then(|s| s.parse().ok()).unwrap_or(0) };

        disks.push(DiskIo {
            device: device.to_string(),
            read_count: get_val(3),
            read_bytes: get_val(5).saturating_mul(SECTOR_SIZE),
            read_time: get_val(6),
            write_count: get_val(7),
            write_bytes: get_val(9).saturating_mul(SECTOR_SIZE),
            write_time: get_val(10),
        });
    }

    disks
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROC_STAT: &str = "\
cpu  2255 34 2290 22625563 6290 127 456 0 0 0
cpu0 1132 34 1441 11311718 3675 127 438 0 0 0
cpu1 1123 0 849 11313845 2614 0 18 0 0 0
intr 114930548 113199788 3 0 5 263 0 4 [... lots more numbers ...]
ctxt 1990473
btime 1062191376
";

    const DISKSTATS: &str = "\
   7       0 loop0 42 0 2080 10 0 0 0 0 0 20 10 0 0 0 0
   8       0 sda 1000 200 40000 3000 500 100 8000 1500 0 4000 4500 0 0 0 0
   8       1 sda1 900 190 36000 2900 480 90 7600 1400 0 3900 4300 0 0 0 0
 259       0 nvme0n1 10 0 16 2 5
";

    #[test]
    fn stat_yields_one_entry_per_core() {
        let cores = parse_proc_stat_times(PROC_STAT);
        assert_eq!(cores.len(), 2);
        assert!((cores[0].user - 11.32).abs() < 1e-9);
        assert!((cores[0].system - 14.41).abs() < 1e-9);
        assert!((cores[1].idle - 113_138.45).abs() < 1e-6);
    }

    #[test]
    fn stat_ignores_short_and_unrelated_lines() {
        let cores = parse_proc_stat_times("cpu0 1 2\ncpufreq 1 2 3 4 5\nprocs_running 2\n");
        assert!(cores.is_empty());
    }

    #[test]
    fn diskstats_skips_virtual_and_malformed_devices() {
        let disks = parse_diskstats(DISKSTATS);
        let names: Vec<&str> = disks.iter().map(|d| d.device.as_str()).collect();
        assert_eq!(names, vec!["sda", "sda1"]);
    }

    #[test]
    fn diskstats_converts_sectors_to_bytes() {
        let disks = parse_diskstats(DISKSTATS);
        let sda = &disks[0];
        assert_eq!(sda.read_count, 1000);
        assert_eq!(sda.write_count, 500);
        assert_eq!(sda.read_bytes, 40_000 * 512);
        assert_eq!(sda.write_bytes, 8_000 * 512);
        assert_eq!(sda.read_time, 3000);
        assert_eq!(sda.write_time, 1500);
    }

    #[test]
    fn proc_root_joins_file_names() {
        let root = ProcRoot::new("/tmp/fake");
        assert_eq!(root.file("stat"), PathBuf::from("/tmp/fake/stat"));
        assert_eq!(ProcRoot::default().file("stat"), PathBuf::from("/proc/stat"));
    }
}
