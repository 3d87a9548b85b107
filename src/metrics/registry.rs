//! Observable Registry
//!
//! Registers the host gauges with the metrics pipeline and answers the
//! pipeline's observation callback with one fresh snapshot per invocation.
//!
//! The registry runs no timer of its own. The pipeline decides when to
//! observe (typically once per scrape or export interval), and the three
//! reported values always come from the same `Metrics` snapshot.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::domain::ports::{CallbackRegistration, GaugeHandle, Meter, Observer};
use crate::error::{Error, Result};
use crate::metrics::Sampler;

/// Gauge reporting CPU utilization in percent.
pub const CPU_USAGE_GAUGE: &str = "cpu.usage";
/// Gauge reporting used memory in MB.
pub const MEMORY_USED_GAUGE: &str = "memory.used";
/// Gauge reporting used disk space in GB.
pub const DISK_USED_GAUGE: &str = "disk.used";

/// The three host gauges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaugeSet {
    pub cpu_usage: GaugeHandle,
    pub memory_used: GaugeHandle,
    pub disk_used: GaugeHandle,
}

impl GaugeSet {
    /// Handles in reporting order.
    pub fn handles(&self) -> [GaugeHandle; 3] {
        [
            self.cpu_usage.clone(),
            self.memory_used.clone(),
            self.disk_used.clone(),
        ]
    }
}

/// Owns the host gauges and their observation callback.
pub struct ObservableRegistry {
    meter: Arc<dyn Meter>,
    sampler: Arc<Sampler>,
    gauges: Option<GaugeSet>,
    registration: Option<CallbackRegistration>,
}

impl ObservableRegistry {
    /// Create an uninitialized registry.
    pub fn new(meter: Arc<dyn Meter>, sampler: Arc<Sampler>) -> Self {
        Self {
            meter,
            sampler,
            gauges: None,
            registration: None,
        }
    }

    /// Create the gauges and register the callback in one step.
    pub fn install(meter: Arc<dyn Meter>, sampler: Arc<Sampler>) -> Result<Self> {
        let mut registry = Self::new(meter, sampler);
        let gauges = registry.initialize()?;
        registry.register_observation_callback(gauges)?;
        Ok(registry)
    }

    /// Create the three gauges against the pipeline.
    #[instrument(skip(self))]
    pub fn initialize(&self) -> Result<GaugeSet> {
        let gauges = GaugeSet {
            cpu_usage: self
                .meter
                .f64_observable_gauge(CPU_USAGE_GAUGE, "Host CPU utilization in percent")?,
            memory_used: self
                .meter
                .f64_observable_gauge(MEMORY_USED_GAUGE, "Host memory in use, in MB")?,
            disk_used: self
                .meter
                .f64_observable_gauge(DISK_USED_GAUGE, "Disk space in use, in GB")?,
        };
        debug!("Created host gauges");
        Ok(gauges)
    }

    /// Register the single observation callback for `gauges`.
    ///
    /// The registry keeps `gauges` for the rest of its life. A second
    /// registration is rejected.
    #[instrument(skip(self, gauges))]
    pub fn register_observation_callback(
        &mut self,
        gauges: GaugeSet,
    ) -> Result<&CallbackRegistration> {
        if self.registration.is_some() {
            return Err(Error::CallbackRegistration(
                "observation callback already registered".to_string(),
            ));
        }

        let sampler = Arc::clone(&self.sampler);
        let observed = gauges.clone();
        let registration = self.meter.register_callback(
            &gauges.handles(),
            Box::new(move |observer: &mut dyn Observer| {
                let m = sampler.sample();
                observer.observe_f64(&observed.cpu_usage, m.cpu_usage_percent);
                observer.observe_f64(&observed.memory_used, m.memory_used_mb as f64);
                observer.observe_f64(&observed.disk_used, m.disk_used_gb as f64);
                Ok(())
            }),
        )?;

        info!(
            registration_id = registration.id,
            gauges = ?registration.gauges,
            "Registered observation callback"
        );

        self.gauges = Some(gauges);
        Ok(self.registration.insert(registration))
    }

    /// Gauges owned by this registry, once registered.
    pub fn gauges(&self) -> Option<&GaugeSet> {
        self.gauges.as_ref()
    }

    /// Active callback registration, if any.
    pub fn registration(&self) -> Option<&CallbackRegistration> {
        self.registration.as_ref()
    }

    /// True once the callback is registered.
    pub fn is_installed(&self) -> bool {
        self.registration.is_some()
    }

    pub fn sampler(&self) -> &Arc<Sampler> {
        &self.sampler
    }
}

impl std::fmt::Debug for ObservableRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableRegistry")
            .field("gauges", &self.gauges)
            .field("registration", &self.registration)
            .finish()
    }
}
