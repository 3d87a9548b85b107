//! Dashboard module
//!
//! HTML rendering of host snapshots.

mod template;

pub use template::{format_percent, DashboardTemplate, Field};
