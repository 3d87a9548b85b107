//! Infrastructure Adapters
//!
//! This module contains adapter implementations for the domain ports,
//! following the Port/Adapter (Hexagonal) architecture pattern.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Domain Layer                              │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │                    Ports (Traits)                           │ │
//! │  │             HostStats       │       Meter                   │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters (This Module)                       │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │ SysinfoHostStats │ FixedHostStats                          │ │
//! │  │ PrometheusMeter  │ InMemoryMeter                           │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use sysdash::adapters::{PrometheusMeter, SysinfoHostStats};
//! use sysdash::metrics::{ObservableRegistry, Sampler};
//!
//! let sampler = Arc::new(Sampler::new(Arc::new(SysinfoHostStats::new()), config));
//! let meter = Arc::new(PrometheusMeter::new("system-metrics-dashboard")?);
//! let registry = ObservableRegistry::install(meter.clone(), sampler)?;
//! let exposition = meter.encode_text()?;
//! ```

mod fixed;
mod in_memory;
mod prometheus_meter;
mod sysinfo_stats;

pub use fixed::FixedHostStats;
pub use in_memory::{InMemoryMeter, Observation};
pub use prometheus_meter::{prometheus_name, PrometheusMeter, METER_LABEL};
pub use sysinfo_stats::SysinfoHostStats;
