//! Fixed Host Statistics Adapter
//!
//! Implements the `HostStats` port with scripted readings, for tests and for
//! embedding the library without live OS statistics.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::RwLock;

use crate::domain::ports::{DiskUsage, HostStats, MemoryUsage, StatQuery};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
struct Readings {
    cpu: Option<f64>,
    memory: Option<MemoryUsage>,
    disk: Option<DiskUsage>,
}

/// Host statistics that return whatever they were told to.
///
/// A `None` reading makes the matching query fail.
#[derive(Debug)]
pub struct FixedHostStats {
    readings: RwLock<Readings>,
    cpu_calls: AtomicUsize,
    memory_calls: AtomicUsize,
    disk_calls: AtomicUsize,
    last_disk_path: RwLock<Option<PathBuf>>,
}

impl FixedHostStats {
    /// Create with all three readings set.
    pub fn new(cpu_percent: f64, memory: MemoryUsage, disk: DiskUsage) -> Self {
        Self {
            readings: RwLock::new(Readings {
                cpu: Some(cpu_percent),
                memory: Some(memory),
                disk: Some(disk),
            }),
            cpu_calls: AtomicUsize::new(0),
            memory_calls: AtomicUsize::new(0),
            disk_calls: AtomicUsize::new(0),
            last_disk_path: RwLock::new(None),
        }
    }

    /// Create with every query failing.
    pub fn unavailable() -> Self {
        let stats = Self::new(0.0, MemoryUsage::default(), DiskUsage::default());
        {
            let mut r = stats.readings.write();
            r.cpu = None;
            r.memory = None;
            r.disk = None;
        }
        stats
    }

    pub fn set_cpu(&self, cpu_percent: Option<f64>) {
        self.readings.write().cpu = cpu_percent;
    }

    pub fn set_memory(&self, memory: Option<MemoryUsage>) {
        self.readings.write().memory = memory;
    }

    pub fn set_disk(&self, disk: Option<DiskUsage>) {
        self.readings.write().disk = disk;
    }

    /// Number of CPU queries served so far.
    pub fn cpu_calls(&self) -> usize {
        self.cpu_calls.load(Ordering::SeqCst)
    }

    /// Number of memory queries served so far.
    pub fn memory_calls(&self) -> usize {
        self.memory_calls.load(Ordering::SeqCst)
    }

    /// Number of disk queries served so far.
    pub fn disk_calls(&self) -> usize {
        self.disk_calls.load(Ordering::SeqCst)
    }

    /// Path passed to the most recent disk query.
    pub fn last_disk_path(&self) -> Option<PathBuf> {
        self.last_disk_path.read().clone()
    }
}

impl HostStats for FixedHostStats {
    fn cpu_percent(&self, _window: Duration) -> Result<f64> {
        self.cpu_calls.fetch_add(1, Ordering::SeqCst);
        self.readings
            .read()
            .cpu
            .ok_or_else(|| Error::host_stat(StatQuery::Cpu, "scripted failure"))
    }

    fn virtual_memory(&self) -> Result<MemoryUsage> {
        self.memory_calls.fetch_add(1, Ordering::SeqCst);
        self.readings
            .read()
            .memory
            .ok_or_else(|| Error::host_stat(StatQuery::Memory, "scripted failure"))
    }

    fn disk_usage(&self, path: &Path) -> Result<DiskUsage> {
        self.disk_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_disk_path.write() = Some(path.to_path_buf());
        self.readings
            .read()
            .disk
            .ok_or_else(|| Error::host_stat(StatQuery::Disk, "scripted failure"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_fixed_readings() {
        let stats = FixedHostStats::new(
            12.5,
            MemoryUsage::from_mb(1, 2),
            DiskUsage::from_gb(3, 4),
        );

        assert_eq!(stats.cpu_percent(Duration::ZERO).unwrap(), 12.5);
        assert_eq!(stats.virtual_memory().unwrap(), MemoryUsage::from_mb(1, 2));
        assert_eq!(
            stats.disk_usage(Path::new("/data")).unwrap(),
            DiskUsage::from_gb(3, 4)
        );
        assert_eq!(stats.last_disk_path(), Some(PathBuf::from("/data")));
        assert_eq!(stats.cpu_calls(), 1);
        assert_eq!(stats.memory_calls(), 1);
        assert_eq!(stats.disk_calls(), 1);
    }

    #[test]
    fn test_scripted_failures() {
        let stats = FixedHostStats::unavailable();

        assert_matches!(
            stats.cpu_percent(Duration::ZERO),
            Err(Error::HostStat {
                query: StatQuery::Cpu,
                ..
            })
        );
        assert_matches!(
            stats.virtual_memory(),
            Err(Error::HostStat {
                query: StatQuery::Memory,
                ..
            })
        );

        stats.set_memory(Some(MemoryUsage::from_mb(5, 10)));
        assert!(stats.virtual_memory().is_ok());
    }
}
