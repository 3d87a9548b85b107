//! sysdash - System Metrics Dashboard
//!
//! Samples host CPU, memory and disk usage and exposes it two ways: as an
//! HTML dashboard and as pull-based gauges in a Prometheus registry.
//!
//! # Architecture
//!
//! ```text
//!                     ┌──────────────┐
//!   HostStats ───────▶│   Sampler    │─────────┐
//!   (sysinfo)         └──────────────┘         │
//!                            │                 ▼
//!                            │        ┌─────────────────┐
//!                            │        │ Dashboard (GET /)│
//!                            ▼        └─────────────────┘
//!                 ┌──────────────────────┐
//!                 │  ObservableRegistry  │──▶ Meter (Prometheus)
//!                 └──────────────────────┘        │
//!                                                 ▼
//!                                          /metrics scrape
//! ```
//!
//! The registry runs no timer: each scrape invokes its callback, which takes
//! one snapshot and reports `cpu.usage`, `memory.used` and `disk.used` from it.
//!
//! # Modules
//!
//! - [`adapters`] - sysinfo, Prometheus and in-memory implementations of the ports
//! - [`config`] - Runtime configuration
//! - [`dashboard`] - HTML template
//! - [`domain`] - Value objects and port traits
//! - [`error`] - Error types
//! - [`metrics`] - Sampler and observable registry
//! - [`server`] - Dashboard and telemetry HTTP servers

pub mod adapters;
pub mod config;
pub mod dashboard;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod server;

// Re-export commonly used types
pub use config::{Config, SamplerConfig};
pub use dashboard::DashboardTemplate;
pub use domain::{HostStats, Meter, Metrics};
pub use error::{Error, Result};
pub use metrics::{GaugeSet, ObservableRegistry, Sampler};
