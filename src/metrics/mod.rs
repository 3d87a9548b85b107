//! Metrics module
//!
//! The sampling core: [`Sampler`] takes host snapshots and
//! [`ObservableRegistry`] reports them to the metrics pipeline on demand.

mod registry;
mod sampler;

pub use registry::{
    GaugeSet, ObservableRegistry, CPU_USAGE_GAUGE, DISK_USED_GAUGE, MEMORY_USED_GAUGE,
};
pub use sampler::Sampler;
