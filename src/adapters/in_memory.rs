//! In-Memory Metrics Pipeline Adapter
//!
//! Implements the `Meter` port without an exporter. `collect()` plays the
//! role of the pipeline's export tick: it runs every registered callback and
//! hands back the observations.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::domain::ports::{
    CallbackRegistration, GaugeHandle, Meter, ObservationCallback, Observer,
};
use crate::error::{Error, Result};

/// One value reported by a callback.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Registration that produced the value
    pub callback_id: u64,
    /// Gauge name
    pub gauge: String,
    /// Reported value
    pub value: f64,
}

struct RegisteredCallback {
    id: u64,
    gauges: HashSet<u64>,
    callback: ObservationCallback,
}

/// Collects the values of a single callback invocation.
struct BatchObserver<'a> {
    callback_id: u64,
    allowed: &'a HashSet<u64>,
    observations: Vec<Observation>,
}

impl Observer for BatchObserver<'_> {
    fn observe_f64(&mut self, gauge: &GaugeHandle, value: f64) {
        if !self.allowed.contains(&gauge.id()) {
            warn!(gauge = gauge.name(), "Ignoring observation for undeclared gauge");
            return;
        }
        self.observations.push(Observation {
            callback_id: self.callback_id,
            gauge: gauge.name().to_string(),
            value,
        });
    }
}

/// Metrics pipeline that keeps everything in memory.
#[derive(Default)]
pub struct InMemoryMeter {
    next_id: AtomicU64,
    gauges: RwLock<HashMap<String, GaugeHandle>>,
    callbacks: RwLock<Vec<RegisteredCallback>>,
}

impl InMemoryMeter {
    /// Create an empty meter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all created gauges, sorted.
    pub fn gauge_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.gauges.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered callbacks.
    pub fn callback_count(&self) -> usize {
        self.callbacks.read().len()
    }

    /// Run every registered callback once and return what they reported.
    ///
    /// The first failing callback aborts the collection and its error is
    /// returned to the caller.
    pub fn collect(&self) -> Result<Vec<Observation>> {
        let callbacks = self.callbacks.read();
        let mut observations = Vec::new();

        for registered in callbacks.iter() {
            let mut observer = BatchObserver {
                callback_id: registered.id,
                allowed: &registered.gauges,
                observations: Vec::new(),
            };
            (registered.callback)(&mut observer).map_err(|e| {
                Error::Observation(format!("callback {}: {}", registered.id, e))
            })?;
            debug!(
                callback_id = registered.id,
                count = observer.observations.len(),
                "Collected observations"
            );
            observations.extend(observer.observations);
        }

        Ok(observations)
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl std::fmt::Debug for InMemoryMeter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryMeter")
            .field("gauges", &self.gauge_names())
            .field("callback_count", &self.callback_count())
            .finish()
    }
}

impl Meter for InMemoryMeter {
    fn f64_observable_gauge(&self, name: &str, _description: &str) -> Result<GaugeHandle> {
        if name.trim().is_empty() {
            return Err(Error::gauge_creation(name, "gauge name must not be empty"));
        }

        let mut gauges = self.gauges.write();
        if gauges.contains_key(name) {
            return Err(Error::gauge_creation(name, "gauge already exists"));
        }

        let handle = GaugeHandle::new(self.next_id(), name);
        gauges.insert(name.to_string(), handle.clone());
        Ok(handle)
    }

    fn register_callback(
        &self,
        gauges: &[GaugeHandle],
        callback: ObservationCallback,
    ) -> Result<CallbackRegistration> {
        if gauges.is_empty() {
            return Err(Error::CallbackRegistration(
                "callback must observe at least one gauge".to_string(),
            ));
        }

        let known = self.gauges.read();
        for gauge in gauges {
            if known.get(gauge.name()) != Some(gauge) {
                return Err(Error::CallbackRegistration(format!(
                    "gauge '{}' was not created by this meter",
                    gauge.name()
                )));
            }
        }
        drop(known);

        let id = self.next_id();
        self.callbacks.write().push(RegisteredCallback {
            id,
            gauges: gauges.iter().map(GaugeHandle::id).collect(),
            callback,
        });

        Ok(CallbackRegistration {
            id,
            gauges: gauges.iter().map(|g| g.name().to_string()).collect(),
        })
    }
}
