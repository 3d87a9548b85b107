//! Health Checks
//!
//! Liveness and readiness state for the telemetry server's probes.
//! The process is ready once instrumentation is installed and the
//! dashboard listener is bound.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    fn from_flag(ok: bool) -> Self {
        if ok {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }

    pub fn is_healthy(&self) -> bool {
        *self == HealthStatus::Healthy
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "Healthy"),
            HealthStatus::Unhealthy => write!(f, "Unhealthy"),
        }
    }
}

/// Result of one named check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthCheckResult {
    fn new(name: &str, ok: bool, failure: &str) -> Self {
        Self {
            name: name.to_string(),
            status: HealthStatus::from_flag(ok),
            message: (!ok).then(|| failure.to_string()),
        }
    }
}

/// Aggregated health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub checks: Vec<HealthCheckResult>,
    pub version: String,
    pub uptime_seconds: u64,
}

impl HealthResponse {
    fn new(checks: Vec<HealthCheckResult>, uptime: Duration) -> Self {
        let status = HealthStatus::from_flag(checks.iter().all(|c| c.status.is_healthy()));
        Self {
            status,
            checks,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: uptime.as_secs(),
        }
    }
}

/// Process health state shared between startup code and the probes
#[derive(Debug)]
pub struct HealthCheck {
    start_time: Instant,
    live: AtomicBool,
    instrumented: AtomicBool,
    dashboard_bound: AtomicBool,
}

impl HealthCheck {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            live: AtomicBool::new(true),
            instrumented: AtomicBool::new(false),
            dashboard_bound: AtomicBool::new(false),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Record that gauges and the observation callback are registered.
    pub fn mark_instrumented(&self) {
        self.instrumented.store(true, Ordering::Relaxed);
    }

    /// Record that the dashboard listener is accepting connections.
    pub fn mark_dashboard_bound(&self) {
        self.dashboard_bound.store(true, Ordering::Relaxed);
    }

    /// Flip liveness, e.g. while shutting down.
    pub fn set_live(&self, live: bool) {
        self.live.store(live, Ordering::Relaxed);
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Relaxed)
    }

    pub fn is_ready(&self) -> bool {
        self.is_live()
            && self.instrumented.load(Ordering::Relaxed)
            && self.dashboard_bound.load(Ordering::Relaxed)
    }

    pub fn liveness_check(&self) -> HealthCheckResult {
        HealthCheckResult::new("liveness", self.is_live(), "Shutting down")
    }

    pub fn readiness_check(&self) -> HealthCheckResult {
        HealthCheckResult::new("readiness", self.is_ready(), "Service not ready")
    }

    /// Full report with one entry per tracked condition.
    pub fn check_all(&self) -> HealthResponse {
        let checks = vec![
            self.liveness_check(),
            HealthCheckResult::new(
                "instrumentation",
                self.instrumented.load(Ordering::Relaxed),
                "Gauges not registered",
            ),
            HealthCheckResult::new(
                "dashboard",
                self.dashboard_bound.load(Ordering::Relaxed),
                "Dashboard listener not bound",
            ),
        ];
        HealthResponse::new(checks, self.uptime())
    }
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self::new()
    }
}
