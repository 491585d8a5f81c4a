use chrono::DateTime;
use sysinfo::{Networks, System};

use crate::domain::entities::static_info::{InterfaceInfo, StaticInfo};
use crate::domain::ports::collector::StaticInfoProvider;

/// Host descriptor read once from `sysinfo`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoStaticInfo;

impl StaticInfoProvider for SysinfoStaticInfo {
    fn static_info(&self) -> StaticInfo {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        sys.refresh_memory();

        let boot_time = i64::try_from(System::boot_time())
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string());

        let networks = Networks::new_with_refreshed_list();
        let mut interfaces: Vec<InterfaceInfo> = networks
            .iter()
            .map(|(name, data)| InterfaceInfo {
                name: name.clone(),
                mac_address: data.mac_address().to_string(),
                ipv4: data
                    .ip_networks()
                    .iter()
                    .filter(|net| net.addr.is_ipv4())
                    .map(|net| net.addr.to_string())
                    .collect(),
            })
            .collect();
        interfaces.sort_by(|a, b| a.name.cmp(&b.name));

        StaticInfo {
            hostname: System::host_name(),
            os_name: System::name(),
            os_version: System::os_version(),
            kernel_version: System::kernel_version(),
            architecture: std::env::consts::ARCH.to_string(),
            cpu_brand: sys
                .cpus()
                .first()
                .map(|cpu| cpu.brand().trim().to_string())
                .filter(|brand| !brand.is_empty()),
            physical_cores: sys.physical_core_count(),
            logical_cores: sys.cpus().len(),
            total_memory: sys.total_memory(),
            total_swap: sys.total_swap(),
            boot_time,
            interfaces,
        }
    }
}
