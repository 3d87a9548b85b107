//! sysinfo Host Statistics Adapter
//!
//! Implements the `HostStats` port using the `sysinfo` crate.

use std::path::Path;
use std::time::Duration;

use sysinfo::{Disks, System, IS_SUPPORTED_SYSTEM, MINIMUM_CPU_UPDATE_INTERVAL};
use tracing::{debug, instrument};

use crate::domain::ports::{DiskUsage, HostStats, MemoryUsage, StatQuery};
use crate::error::{Error, Result};

/// Host statistics read through `sysinfo`.
///
/// Every call builds its own `System`/`Disks` handle, so concurrent callers
/// never share a measurement window and nothing is cached between calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysinfoHostStats;

impl SysinfoHostStats {
    pub fn new() -> Self {
        Self
    }

    fn ensure_supported(query: StatQuery) -> Result<()> {
        if IS_SUPPORTED_SYSTEM {
            Ok(())
        } else {
            Err(Error::host_stat(
                query,
                format!("unsupported platform: {}", std::env::consts::OS),
            ))
        }
    }
}

impl HostStats for SysinfoHostStats {
    #[instrument(skip(self))]
    fn cpu_percent(&self, window: Duration) -> Result<f64> {
        Self::ensure_supported(StatQuery::Cpu)?;

        let mut system = System::new();
        system.refresh_cpu();
        std::thread::sleep(window.max(MINIMUM_CPU_UPDATE_INTERVAL));
        system.refresh_cpu();

        if system.cpus().is_empty() {
            return Err(Error::host_stat(StatQuery::Cpu, "no CPUs reported"));
        }

        let usage = f64::from(system.global_cpu_info().cpu_usage());
        debug!(usage, "Measured CPU usage");
        Ok(usage)
    }

    fn virtual_memory(&self) -> Result<MemoryUsage> {
        Self::ensure_supported(StatQuery::Memory)?;

        let mut system = System::new();
        system.refresh_memory();

        let total = system.total_memory();
        if total == 0 {
            return Err(Error::host_stat(StatQuery::Memory, "total memory reported as zero"));
        }

        Ok(MemoryUsage::new(system.used_memory(), total))
    }

    fn disk_usage(&self, path: &Path) -> Result<DiskUsage> {
        Self::ensure_supported(StatQuery::Disk)?;

        let disks = Disks::new_with_refreshed_list();
        let mounts = disks
            .list()
            .iter()
            .map(|d| (d.mount_point(), d.total_space(), d.available_space()));

        let (total, available) =
            containing_mount(path, mounts).ok_or_else(|| Error::MountNotFound {
                path: path.display().to_string(),
            })?;

        Ok(DiskUsage::new(total.saturating_sub(available), total))
    }
}

/// Pick the mount with the longest mount point that contains `path`.
///
/// `available` is the space left to unprivileged users, so `total - available`
/// counts blocks reserved for root as used.
fn containing_mount<'a, I>(path: &Path, mounts: I) -> Option<(u64, u64)>
where
    I: IntoIterator<Item = (&'a Path, u64, u64)>,
{
    mounts
        .into_iter()
        .filter(|(mount, _, _)| path.starts_with(mount))
        .max_by_key(|(mount, _, _)| mount.components().count())
        .map(|(_, total, available)| (total, available))
}
