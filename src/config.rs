//! Runtime configuration
//!
//! Built from command-line arguments by the binary; every field has a default
//! so embedders can start from `Config::default()`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Name the metrics pipeline reports as the meter label.
pub const DEFAULT_METER_NAME: &str = "system-metrics-dashboard";

/// CPU measurement window used per sample.
pub const DEFAULT_CPU_WINDOW: Duration = Duration::from_secs(1);

/// Dashboard, telemetry and sampling configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Dashboard bind address
    pub dashboard_addr: SocketAddr,

    /// Telemetry (metrics + health) bind address
    pub telemetry_addr: SocketAddr,

    /// Dashboard template file; the built-in template is used when unset
    pub template_path: Option<PathBuf>,

    /// Sampler settings
    pub sampler: SamplerConfig,

    /// Meter name attached to every exported gauge
    pub meter_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dashboard_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            telemetry_addr: SocketAddr::from(([0, 0, 0, 0], 9464)),
            template_path: None,
            sampler: SamplerConfig::default(),
            meter_name: DEFAULT_METER_NAME.to_string(),
        }
    }
}

impl Config {
    /// Reject configurations that cannot serve.
    pub fn validate(&self) -> Result<()> {
        if self.dashboard_addr == self.telemetry_addr && self.dashboard_addr.port() != 0 {
            return Err(Error::Config(format!(
                "dashboard and telemetry servers cannot share {}",
                self.dashboard_addr
            )));
        }
        if self.meter_name.trim().is_empty() {
            return Err(Error::Config("meter name must not be empty".to_string()));
        }
        self.sampler.validate()
    }
}

/// Sampler configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerConfig {
    /// Path whose filesystem is reported as disk usage
    pub disk_path: PathBuf,

    /// CPU measurement window
    pub cpu_window: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            disk_path: PathBuf::from("/"),
            cpu_window: DEFAULT_CPU_WINDOW,
        }
    }
}

impl SamplerConfig {
    pub fn with_disk_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.disk_path = path.into();
        self
    }

    pub fn with_cpu_window(mut self, window: Duration) -> Self {
        self.cpu_window = window;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.disk_path.is_absolute() {
            return Err(Error::Config(format!(
                "disk path must be absolute: {}",
                self.disk_path.display()
            )));
        }
        if self.cpu_window.is_zero() {
            return Err(Error::Config("CPU window must be non-zero".to_string()));
        }
        Ok(())
    }
}
