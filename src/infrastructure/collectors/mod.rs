pub mod disk_collector;
pub mod procfs;
pub mod static_info;
pub mod sysinfo_collector;
