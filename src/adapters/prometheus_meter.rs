//! Prometheus Metrics Pipeline Adapter
//!
//! Implements the `Meter` port on top of a `prometheus::Registry`.
//!
//! Each registered callback becomes a custom [`Collector`]: whenever the
//! registry is gathered (one scrape of `/metrics`), the callback runs once and
//! the values it reports are exported. Nothing is polled in the background.
//!
//! Gauges are built fresh for every scrape, so concurrent scrapes never see
//! each other's values.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use prometheus::core::{Collector, Desc, Describer};
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Gauge, Opts, Registry, TextEncoder};
use tracing::{debug, error, warn};

use crate::domain::ports::{
    CallbackRegistration, GaugeHandle, Meter, ObservationCallback, Observer,
};
use crate::error::{Error, Result};

/// Constant label carrying the meter name on every exported series.
pub const METER_LABEL: &str = "meter";

/// Map a dotted instrument name onto the Prometheus name charset.
pub fn prometheus_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == ':' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Metrics pipeline backed by a Prometheus registry.
pub struct PrometheusMeter {
    registry: Registry,
    next_id: AtomicU64,
    gauges: RwLock<HashMap<u64, Opts>>,
    names: RwLock<HashSet<String>>,
}

impl PrometheusMeter {
    /// Create a meter whose series all carry `meter="<meter_name>"`.
    pub fn new(meter_name: &str) -> Result<Self> {
        let labels = HashMap::from([(METER_LABEL.to_string(), meter_name.to_string())]);
        let registry = Registry::new_custom(None, Some(labels))?;
        Ok(Self::with_registry(registry))
    }

    /// Wrap an existing registry.
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            next_id: AtomicU64::new(0),
            gauges: RwLock::new(HashMap::new()),
            names: RwLock::new(HashSet::new()),
        }
    }

    /// Underlying registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run every registered callback and return the resulting families.
    ///
    /// Blocks for as long as the callbacks do.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Gather and render in the Prometheus text exposition format.
    pub fn encode_text(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let families = self.gather();
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| Error::Internal(format!("Non-UTF-8 exposition: {}", e)))
    }

    /// Content type of [`encode_text`](Self::encode_text) output.
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}

impl std::fmt::Debug for PrometheusMeter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusMeter")
            .field("gauge_count", &self.gauges.read().len())
            .finish()
    }
}

impl Meter for PrometheusMeter {
    fn f64_observable_gauge(&self, name: &str, description: &str) -> Result<GaugeHandle> {
        if name.trim().is_empty() {
            return Err(Error::gauge_creation(name, "gauge name must not be empty"));
        }

        let metric_name = prometheus_name(name);
        let help = if description.is_empty() {
            name.to_string()
        } else {
            description.to_string()
        };

        let mut names = self.names.write();
        if names.contains(&metric_name) {
            return Err(Error::gauge_creation(
                name,
                format!("metric '{}' already exists", metric_name),
            ));
        }

        let opts = Opts::new(metric_name.clone(), help);
        opts.describe()
            .map_err(|e| Error::gauge_creation(name, e.to_string()))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        names.insert(metric_name.clone());
        self.gauges.write().insert(id, opts);

        debug!(gauge = name, metric = %metric_name, "Created observable gauge");
        Ok(GaugeHandle::new(id, name))
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
        let mut bound = Vec::with_capacity(gauges.len());
        for handle in gauges {
            let opts = known.get(&handle.id()).ok_or_else(|| {
                Error::CallbackRegistration(format!(
                    "gauge '{}' was not created by this meter",
                    handle.name()
                ))
            })?;
            let desc = opts
                .describe()
                .map_err(|e| Error::CallbackRegistration(e.to_string()))?;
            bound.push(ObservedGauge {
                handle: handle.clone(),
                opts: opts.clone(),
                desc,
            });
        }
        drop(known);

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let collector = ObservedGauges {
            id,
            gauges: bound,
            callback,
        };
        self.registry
            .register(Box::new(collector))
            .map_err(|e| Error::CallbackRegistration(e.to_string()))?;

        Ok(CallbackRegistration {
            id,
            gauges: gauges.iter().map(|g| g.name().to_string()).collect(),
        })
    }
}

// =============================================================================
// Callback Collector
// =============================================================================

struct ObservedGauge {
    handle: GaugeHandle,
    opts: Opts,
    desc: Desc,
}

/// Gauges whose values come from one observation callback.
struct ObservedGauges {
    id: u64,
    gauges: Vec<ObservedGauge>,
    callback: ObservationCallback,
}

struct GaugeObserver<'a> {
    declared: &'a [ObservedGauge],
    values: HashMap<u64, f64>,
}

impl Observer for GaugeObserver<'_> {
    fn observe_f64(&mut self, gauge: &GaugeHandle, value: f64) {
        if self.declared.iter().any(|g| g.handle == *gauge) {
            self.values.insert(gauge.id(), value);
        } else {
            warn!(gauge = gauge.name(), "Ignoring observation for undeclared gauge");
        }
    }
}

impl Collector for ObservedGauges {
    fn desc(&self) -> Vec<&Desc> {
        self.gauges.iter().map(|g| &g.desc).collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut observer = GaugeObserver {
            declared: &self.gauges,
            values: HashMap::new(),
        };

        // A failing callback drops the whole batch; Prometheus has no error
        // channel from collectors, so the failure is logged here.
        if let Err(e) = (self.callback)(&mut observer) {
            let e = Error::Observation(format!("callback {}: {}", self.id, e));
            error!(error = %e, "Dropping scrape");
            return Vec::new();
        }

        let values = observer.values;
        let mut families = Vec::with_capacity(values.len());
        for observed in &self.gauges {
            let Some(value) = values.get(&observed.handle.id()) else {
                continue;
            };
            match Gauge::with_opts(observed.opts.clone()) {
                Ok(gauge) => {
                    gauge.set(*value);
                    families.extend(gauge.collect());
                }
                Err(e) => error!(gauge = observed.handle.name(), error = %e, "Failed to build gauge"),
            }
        }
        families
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn meter() -> PrometheusMeter {
        PrometheusMeter::new("test-meter").unwrap()
    }

    #[test]
    fn test_prometheus_name() {
        assert_eq!(prometheus_name("cpu.usage"), "cpu_usage");
        assert_eq!(prometheus_name("disk-used:total"), "disk_used:total");
        assert_eq!(prometheus_name("9lives"), "_9lives");
    }

    #[test]
    fn test_duplicate_gauge_rejected() {
        let meter = meter();
        meter.f64_observable_gauge("memory.used", "").unwrap();

        assert_matches!(
            meter.f64_observable_gauge("memory.used", ""),
            Err(Error::GaugeCreation { .. })
        );
        // Maps onto the same Prometheus name
        assert_matches!(
            meter.f64_observable_gauge("memory_used", ""),
            Err(Error::GaugeCreation { .. })
        );
        assert_matches!(
            meter.f64_observable_gauge("", ""),
            Err(Error::GaugeCreation { .. })
        );
    }

    #[test]
    fn test_gather_runs_callback_once_per_scrape() {
        let meter = meter();
        let cpu = meter.f64_observable_gauge("cpu.usage", "CPU usage").unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let handle = cpu.clone();
        let counter = calls.clone();
        meter
            .register_callback(
                &[cpu],
                Box::new(move |o: &mut dyn Observer| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    o.observe_f64(&handle, 42.5);
                    Ok(())
                }),
            )
            .unwrap();

        let families = meter.gather();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(families.len(), 1);

        let text = meter.encode_text().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(text.contains("# HELP cpu_usage CPU usage"));
        assert!(text.contains("cpu_usage{meter=\"test-meter\"} 42.5"));
    }

    #[test]
    fn test_encode_text_includes_meter_label() {
        let meter = meter();
        let disk = meter.f64_observable_gauge("disk.used", "Disk used").unwrap();
        let handle = disk.clone();
        meter
            .register_callback(
                &[disk],
                Box::new(move |o: &mut dyn Observer| {
                    o.observe_f64(&handle, 100.0);
                    Ok(())
                }),
            )
            .unwrap();

        let text = meter.encode_text().unwrap();
        assert!(text.contains("# TYPE disk_used gauge"));
        assert!(text.contains("disk_used{meter=\"test-meter\"} 100"));
        assert!(meter.content_type().starts_with("text/plain"));
    }

    #[test]
    fn test_unobserved_gauge_not_exported() {
        let meter = meter();
        let a = meter.f64_observable_gauge("a", "").unwrap();
        let b = meter.f64_observable_gauge("b", "").unwrap();
        let ha = a.clone();

        meter
            .register_callback(
                &[a, b],
                Box::new(move |o: &mut dyn Observer| {
                    o.observe_f64(&ha, 1.0);
                    Ok(())
                }),
            )
            .unwrap();

        let text = meter.encode_text().unwrap();
        assert!(text.contains("# TYPE a gauge"));
        assert!(!text.contains("# TYPE b gauge"));
    }

    /// Values of every sample line in one exposition.
    fn sample_values(text: &str) -> Vec<String> {
        text.lines()
            .filter(|l| !l.starts_with('#') && !l.is_empty())
            .filter_map(|l| l.rsplit(' ').next())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_concurrent_scrapes_report_one_snapshot_each() {
        let meter = Arc::new(meter());
        let gauges: Vec<GaugeHandle> = ["cpu.usage", "memory.used", "disk.used"]
            .iter()
            .map(|n| meter.f64_observable_gauge(n, "").unwrap())
            .collect();

        let sequence = Arc::new(AtomicUsize::new(0));
        let handles = gauges.clone();
        let counter = sequence.clone();
        meter
            .register_callback(
                &gauges,
                Box::new(move |o: &mut dyn Observer| {
                    let v = counter.fetch_add(1, Ordering::SeqCst) as f64;
                    for h in &handles {
                        o.observe_f64(h, v);
                    }
                    Ok(())
                }),
            )
            .unwrap();

        std::thread::scope(|s| {
            for _ in 0..8 {
                let meter = meter.clone();
                s.spawn(move || {
                    for _ in 0..500 {
                        let values = sample_values(&meter.encode_text().unwrap());
                        assert_eq!(values.len(), 3);
                        assert!(values.iter().all(|v| *v == values[0]), "{:?}", values);
                    }
                });
            }
        });

        assert_eq!(sequence.load(Ordering::SeqCst), 8 * 500);
    }

    #[test]
    fn test_failing_callback_exports_nothing() {
        let meter = meter();
        let g = meter.f64_observable_gauge("g", "").unwrap();
        meter
            .register_callback(
                &[g],
                Box::new(|_: &mut dyn Observer| Err(Error::Internal("boom".to_string()))),
            )
            .unwrap();

        assert!(meter.gather().is_empty());
    }

    #[test]
    fn test_registration_errors() {
        let meter = meter();
        assert_matches!(
            meter.register_callback(&[], Box::new(|_: &mut dyn Observer| Ok(()))),
            Err(Error::CallbackRegistration(_))
        );

        let foreign = GaugeHandle::new(77, "foreign");
        assert_matches!(
            meter.register_callback(&[foreign], Box::new(|_: &mut dyn Observer| Ok(()))),
            Err(Error::CallbackRegistration(_))
        );

        // A gauge can back only one callback
        let g = meter.f64_observable_gauge("g", "").unwrap();
        meter
            .register_callback(&[g.clone()], Box::new(|_: &mut dyn Observer| Ok(())))
            .unwrap();
        assert_matches!(
            meter.register_callback(&[g], Box::new(|_: &mut dyn Observer| Ok(()))),
            Err(Error::CallbackRegistration(_))
        );
    }
}
