//! Domain Ports (Port/Adapter Pattern)
//!
//! This module defines the abstractions the sampling core depends on.
//! Infrastructure adapters implement these traits to provide concrete
//! implementations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Domain Layer                            │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                    Ports (Traits)                    │    │
//! │  │        HostStats   │   Meter   │   Observer          │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Infrastructure Layer                       │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                  Adapters (Impls)                    │    │
//! │  │  SysinfoHostStats │ PrometheusMeter │ InMemoryMeter  │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

const BYTES_PER_MB: u64 = 1024 * 1024;
const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

// =============================================================================
// Value Objects
// =============================================================================

/// One of the three OS statistics queries made per sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatQuery {
    Cpu,
    Memory,
    Disk,
}

impl std::fmt::Display for StatQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatQuery::Cpu => write!(f, "cpu"),
            StatQuery::Memory => write!(f, "memory"),
            StatQuery::Disk => write!(f, "disk"),
        }
    }
}

/// Virtual memory usage in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryUsage {
    pub used_bytes: u64,
    pub total_bytes: u64,
}

impl MemoryUsage {
    pub fn new(used_bytes: u64, total_bytes: u64) -> Self {
        Self {
            used_bytes,
            total_bytes,
        }
    }

    /// Construct from megabyte figures.
    pub fn from_mb(used_mb: u64, total_mb: u64) -> Self {
        Self::new(
            used_mb.saturating_mul(BYTES_PER_MB),
            total_mb.saturating_mul(BYTES_PER_MB),
        )
    }
}

/// Filesystem usage for one mount, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiskUsage {
    pub used_bytes: u64,
    pub total_bytes: u64,
}

impl DiskUsage {
    pub fn new(used_bytes: u64, total_bytes: u64) -> Self {
        Self {
            used_bytes,
            total_bytes,
        }
    }

    /// Construct from gigabyte figures.
    pub fn from_gb(used_gb: u64, total_gb: u64) -> Self {
        Self::new(
            used_gb.saturating_mul(BYTES_PER_GB),
            total_gb.saturating_mul(BYTES_PER_GB),
        )
    }
}

/// Point-in-time snapshot of host resource usage.
///
/// Built once per sample and never mutated afterwards. Fields whose query
/// failed are zero and the failed query is listed in `unavailable`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    /// CPU utilization, 0-100
    pub cpu_usage_percent: f64,
    /// Used memory in MB
    pub memory_used_mb: u64,
    /// Total memory in MB
    pub memory_total_mb: u64,
    /// Used disk space in GB
    pub disk_used_gb: u64,
    /// Total disk space in GB
    pub disk_total_gb: u64,
    /// When the sample was taken
    pub sampled_at: DateTime<Utc>,
    /// Queries that failed and were reported as zero
    pub unavailable: Vec<StatQuery>,
}

impl Metrics {
    /// Build a snapshot from raw readings. `None` marks a failed query.
    pub fn from_readings(
        cpu_percent: Option<f64>,
        memory: Option<MemoryUsage>,
        disk: Option<DiskUsage>,
    ) -> Self {
        let mut unavailable = Vec::new();

        let cpu_usage_percent = match cpu_percent {
            Some(v) if v.is_finite() => v.clamp(0.0, 100.0),
            Some(_) => 0.0,
            None => {
                unavailable.push(StatQuery::Cpu);
                0.0
            }
        };

        let memory = memory.unwrap_or_else(|| {
            unavailable.push(StatQuery::Memory);
            MemoryUsage::default()
        });

        let disk = disk.unwrap_or_else(|| {
            unavailable.push(StatQuery::Disk);
            DiskUsage::default()
        });

        // used <= total holds for bytes, and floor division preserves it
        let memory_used = memory.used_bytes.min(memory.total_bytes);
        let disk_used = disk.used_bytes.min(disk.total_bytes);

        Self {
            cpu_usage_percent,
            memory_used_mb: memory_used / BYTES_PER_MB,
            memory_total_mb: memory.total_bytes / BYTES_PER_MB,
            disk_used_gb: disk_used / BYTES_PER_GB,
            disk_total_gb: disk.total_bytes / BYTES_PER_GB,
            sampled_at: Utc::now(),
            unavailable,
        }
    }

    /// True when every query succeeded.
    pub fn is_complete(&self) -> bool {
        self.unavailable.is_empty()
    }
}

// =============================================================================
// Host Statistics Port
// =============================================================================

/// Source of OS-reported resource statistics.
///
/// Implementations must not cache: every call reads live state.
pub trait HostStats: Send + Sync {
    /// CPU utilization percentage measured over `window`. Blocks for the window.
    fn cpu_percent(&self, window: Duration) -> Result<f64>;

    /// Current virtual memory usage.
    fn virtual_memory(&self) -> Result<MemoryUsage>;

    /// Usage of the filesystem containing `path`.
    fn disk_usage(&self, path: &Path) -> Result<DiskUsage>;
}

// =============================================================================
// Metrics Pipeline Port
// =============================================================================

/// Opaque reference to a gauge created by a [`Meter`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GaugeHandle {
    id: u64,
    name: Arc<str>,
}

impl GaugeHandle {
    /// Only meters should mint handles.
    pub fn new(id: u64, name: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Receives the values reported during one callback invocation.
pub trait Observer {
    fn observe_f64(&mut self, gauge: &GaugeHandle, value: f64);
}

/// Callback run by the pipeline whenever it wants fresh gauge values.
pub type ObservationCallback = Box<dyn Fn(&mut dyn Observer) -> Result<()> + Send + Sync>;

/// Proof of a registered callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackRegistration {
    pub id: u64,
    pub gauges: Vec<String>,
}

/// External metrics pipeline that owns gauges and schedules observations.
pub trait Meter: Send + Sync {
    /// Create a pull-based float gauge.
    fn f64_observable_gauge(&self, name: &str, description: &str) -> Result<GaugeHandle>;

    /// Register `callback` as the value source for `gauges`.
    fn register_callback(
        &self,
        gauges: &[GaugeHandle],
        callback: ObservationCallback,
    ) -> Result<CallbackRegistration>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_unit_conversion() {
        let m = Metrics::from_readings(
            Some(42.5),
            Some(MemoryUsage::from_mb(2048, 8192)),
            Some(DiskUsage::from_gb(100, 500)),
        );

        assert_eq!(m.cpu_usage_percent, 42.5);
        assert_eq!(m.memory_used_mb, 2048);
        assert_eq!(m.memory_total_mb, 8192);
        assert_eq!(m.disk_used_gb, 100);
        assert_eq!(m.disk_total_gb, 500);
        assert!(m.is_complete());
    }

    #[test]
    fn test_conversion_floors() {
        let m = Metrics::from_readings(
            Some(1.0),
            Some(MemoryUsage::new(BYTES_PER_MB * 3 - 1, BYTES_PER_MB * 4 + 7)),
            Some(DiskUsage::new(BYTES_PER_GB - 1, BYTES_PER_GB * 2)),
        );

        assert_eq!(m.memory_used_mb, 2);
        assert_eq!(m.memory_total_mb, 4);
        assert_eq!(m.disk_used_gb, 0);
        assert_eq!(m.disk_total_gb, 2);
    }

    #[test]
    fn test_failed_readings_degrade_to_zero() {
        let m = Metrics::from_readings(Some(10.0), None, Some(DiskUsage::from_gb(1, 2)));

        assert_eq!(m.memory_used_mb, 0);
        assert_eq!(m.memory_total_mb, 0);
        assert_eq!(m.disk_used_gb, 1);
        assert_eq!(m.unavailable, vec![StatQuery::Memory]);
        assert!(!m.is_complete());
    }

    #[test]
    fn test_corrupt_readings_normalized() {
        let m = Metrics::from_readings(
            Some(f64::NAN),
            Some(MemoryUsage::from_mb(10, 5)),
            Some(DiskUsage::from_gb(9, 3)),
        );

        assert_eq!(m.cpu_usage_percent, 0.0);
        assert_eq!(m.memory_used_mb, 5);
        assert_eq!(m.disk_used_gb, 3);

        let m = Metrics::from_readings(Some(250.0), None, None);
        assert_eq!(m.cpu_usage_percent, 100.0);
    }

    #[test]
    fn test_unit_constructors_saturate() {
        let memory = MemoryUsage::from_mb(u64::MAX, u64::MAX / 2);
        assert_eq!(memory.used_bytes, u64::MAX);
        assert_eq!(memory.total_bytes, u64::MAX);

        let disk = DiskUsage::from_gb(1, u64::MAX);
        assert_eq!(disk.used_bytes, BYTES_PER_GB);
        assert_eq!(disk.total_bytes, u64::MAX);
    }

    #[test]
    fn test_stat_query_display() {
        assert_eq!(StatQuery::Cpu.to_string(), "cpu");
        assert_eq!(StatQuery::Memory.to_string(), "memory");
        assert_eq!(StatQuery::Disk.to_string(), "disk");
    }

    #[test]
    fn test_gauge_handle_identity() {
        let a = GaugeHandle::new(1, "cpu.usage");
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(b.name(), "cpu.usage");
        assert_ne!(a, GaugeHandle::new(2, "cpu.usage"));
    }
}
