//! Sampler
//!
//! Turns the three OS statistics queries into one `Metrics` snapshot.
//! Sampling is best-effort: a failed query zeroes its fields instead of
//! failing the snapshot.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::config::SamplerConfig;
use crate::domain::ports::{HostStats, Metrics, StatQuery};
use crate::error::{Error, Result};

/// Produces fresh `Metrics` snapshots from a `HostStats` source.
pub struct Sampler {
    stats: Arc<dyn HostStats>,
    config: SamplerConfig,
}

impl Sampler {
    /// Create a sampler over `stats`.
    pub fn new(stats: Arc<dyn HostStats>, config: SamplerConfig) -> Self {
        Self { stats, config }
    }

    /// Sampler configuration.
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Take a snapshot.
    ///
    /// Blocks for the configured CPU window. Never cached: every call queries
    /// the host again.
    #[instrument(skip(self), fields(disk_path = %self.config.disk_path.display()))]
    pub fn sample(&self) -> Metrics {
        let cpu = degrade(
            StatQuery::Cpu,
            self.stats.cpu_percent(self.config.cpu_window),
        );
        let memory = degrade(StatQuery::Memory, self.stats.virtual_memory());
        let disk = degrade(
            StatQuery::Disk,
            self.stats.disk_usage(&self.config.disk_path),
        );

        let metrics = Metrics::from_readings(cpu, memory, disk);
        debug!(
            cpu = metrics.cpu_usage_percent,
            memory_used_mb = metrics.memory_used_mb,
            disk_used_gb = metrics.disk_used_gb,
            complete = metrics.is_complete(),
            "Sampled host metrics"
        );
        metrics
    }

    /// Take a snapshot on the blocking pool.
    ///
    /// Dropping the returned future does not interrupt the measurement; its
    /// result is simply discarded.
    pub async fn sample_async(self: &Arc<Self>) -> Result<Metrics> {
        let sampler = Arc::clone(self);
        tokio::task::spawn_blocking(move || sampler.sample())
            .await
            .map_err(|e| Error::Internal(format!("Sampling task failed: {}", e)))
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("config", &self.config)
            .finish()
    }
}

fn degrade<T>(query: StatQuery, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(query = %query, error = %e, "Host statistics query failed, reporting zero");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::FixedHostStats;
    use crate::domain::ports::{DiskUsage, MemoryUsage};
    use std::path::PathBuf;

    fn fixed() -> Arc<FixedHostStats> {
        Arc::new(FixedHostStats::new(
            42.5,
            MemoryUsage::from_mb(2048, 8192),
            DiskUsage::from_gb(100, 500),
        ))
    }

    #[test]
    fn test_sample_scenario() {
        let sampler = Sampler::new(fixed(), SamplerConfig::default());
        let m = sampler.sample();

        assert_eq!(m.cpu_usage_percent, 42.5);
        assert_eq!(m.memory_used_mb, 2048);
        assert_eq!(m.memory_total_mb, 8192);
        assert_eq!(m.disk_used_gb, 100);
        assert_eq!(m.disk_total_gb, 500);
        assert!(m.is_complete());
    }

    #[test]
    fn test_sample_is_never_cached() {
        let stats = fixed();
        let sampler = Sampler::new(stats.clone(), SamplerConfig::default());

        let first = sampler.sample();
        stats.set_cpu(Some(10.0));
        let second = sampler.sample();

        assert_eq!(first.cpu_usage_percent, 42.5);
        assert_eq!(second.cpu_usage_percent, 10.0);
        assert_eq!(stats.cpu_calls(), 2);
        assert_eq!(stats.memory_calls(), 2);
        assert_eq!(stats.disk_calls(), 2);
    }

    #[test]
    fn test_memory_failure_degrades_only_memory() {
        let stats = fixed();
        stats.set_memory(None);
        let sampler = Sampler::new(stats, SamplerConfig::default());

        let m = sampler.sample();
        assert_eq!(m.memory_used_mb, 0);
        assert_eq!(m.memory_total_mb, 0);
        assert_eq!(m.cpu_usage_percent, 42.5);
        assert_eq!(m.disk_used_gb, 100);
        assert_eq!(m.disk_total_gb, 500);
        assert_eq!(m.unavailable, vec![StatQuery::Memory]);
    }

    #[test]
    fn test_all_failures_still_return_snapshot() {
        let sampler = Sampler::new(
            Arc::new(FixedHostStats::unavailable()),
            SamplerConfig::default(),
        );

        let m = sampler.sample();
        assert_eq!(m.cpu_usage_percent, 0.0);
        assert_eq!(m.memory_total_mb, 0);
        assert_eq!(m.disk_total_gb, 0);
        assert_eq!(
            m.unavailable,
            vec![StatQuery::Cpu, StatQuery::Memory, StatQuery::Disk]
        );
    }

    #[test]
    fn test_disk_path_forwarded() {
        let stats = fixed();
        let sampler = Sampler::new(
            stats.clone(),
            SamplerConfig::default().with_disk_path("/srv"),
        );

        sampler.sample();
        assert_eq!(stats.last_disk_path(), Some(PathBuf::from("/srv")));
    }

    #[tokio::test]
    async fn test_sample_async() {
        let sampler = Arc::new(Sampler::new(fixed(), SamplerConfig::default()));
        let m = sampler.sample_async().await.unwrap();
        assert_eq!(m.memory_used_mb, 2048);
    }
}
