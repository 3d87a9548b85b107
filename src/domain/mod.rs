//! Domain Layer
//!
//! Value objects and port traits shared by the sampler, the observable
//! registry and the adapters.
//!
//! - **Ports** (`ports.rs`) - Trait abstractions for the OS-stat source and
//!   the metrics pipeline
//!
//! # Usage
//!
//! ```ignore
//! use sysdash::domain::ports::{HostStats, Metrics};
//!
//! fn render<S: HostStats>(stats: &S) -> sysdash::Result<()> {
//!     let memory = stats.virtual_memory()?;
//!     // ...
//! }
//! ```

pub mod ports;

mod proptest;

pub use ports::{
    CallbackRegistration, DiskUsage, GaugeHandle, HostStats, MemoryUsage, Meter, Metrics,
    ObservationCallback, Observer, StatQuery,
};
