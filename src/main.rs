//! System Metrics Dashboard
//!
//! Serves host CPU, memory and disk usage as an HTML page and as
//! Prometheus gauges.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    System Metrics Dashboard                      │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐       │
//! │  │   Sampler    │───▶│  Observable  │───▶│  Prometheus  │       │
//! │  │  (sysinfo)   │    │   Registry   │    │  /metrics    │       │
//! │  └──────────────┘    └──────────────┘    └──────────────┘       │
//! │         │                                                        │
//! │         └──────────────▶ Dashboard (GET /)                       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sysdash::adapters::{PrometheusMeter, SysinfoHostStats};
use sysdash::config::{Config, SamplerConfig, DEFAULT_METER_NAME};
use sysdash::error::Result;
use sysdash::metrics::{ObservableRegistry, Sampler};
use sysdash::server::{self, DashboardState, HealthCheck, TelemetryState};
use sysdash::DashboardTemplate;

// =============================================================================
// CLI Arguments
// =============================================================================

/// System Metrics Dashboard - host usage as HTML and Prometheus gauges
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Dashboard bind address
    #[arg(long, env = "DASHBOARD_ADDR", default_value = "0.0.0.0:8080")]
    dashboard_addr: SocketAddr,

    /// Telemetry (metrics + health) bind address
    #[arg(long, env = "TELEMETRY_ADDR", default_value = "0.0.0.0:9464")]
    telemetry_addr: SocketAddr,

    /// Dashboard template file (built-in template when omitted)
    #[arg(long, env = "DASHBOARD_TEMPLATE")]
    template: Option<PathBuf>,

    /// Path whose filesystem is reported as disk usage
    #[arg(long, env = "DISK_PATH", default_value = "/")]
    disk_path: PathBuf,

    /// CPU measurement window in milliseconds
    #[arg(long, env = "CPU_WINDOW_MS", default_value = "1000")]
    cpu_window_ms: u64,

    /// Meter name attached to exported gauges
    #[arg(long, env = "METER_NAME", default_value = DEFAULT_METER_NAME)]
    meter_name: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn to_config(&self) -> Config {
        Config {
            dashboard_addr: self.dashboard_addr,
            telemetry_addr: self.telemetry_addr,
            template_path: self.template.clone(),
            sampler: SamplerConfig::default()
                .with_disk_path(self.disk_path.clone())
                .with_cpu_window(Duration::from_millis(self.cpu_window_ms)),
            meter_name: self.meter_name.clone(),
        }
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    let config = args.to_config();
    config.validate()?;

    info!("Starting System Metrics Dashboard");
    info!("  Dashboard address: {}", config.dashboard_addr);
    info!("  Telemetry address: {}", config.telemetry_addr);
    info!("  Disk path: {}", config.sampler.disk_path.display());
    info!("  CPU window: {:?}", config.sampler.cpu_window);

    let template = match &config.template_path {
        Some(path) => DashboardTemplate::load(path)?,
        None => DashboardTemplate::builtin()?,
    };

    let sampler = Arc::new(Sampler::new(
        Arc::new(SysinfoHostStats::new()),
        config.sampler.clone(),
    ));

    // Instrumentation must be in place before anything is served
    let meter = Arc::new(PrometheusMeter::new(&config.meter_name)?);
    let registry = ObservableRegistry::install(meter.clone(), sampler.clone()).map_err(|e| {
        error!("Failed to install instrumentation: {}", e);
        e
    })?;
    info!("Instrumentation installed: {:?}", registry.registration());

    let health = Arc::new(HealthCheck::new());
    health.mark_instrumented();

    let telemetry_listener = server::bind("telemetry", config.telemetry_addr).await?;
    let dashboard_listener = server::bind("dashboard", config.dashboard_addr).await?;
    health.mark_dashboard_bound();

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone(), health.clone());

    let dashboard = server::run_dashboard_server(
        dashboard_listener,
        Arc::new(DashboardState::new(sampler, template)),
        shutdown.clone(),
    );
    let telemetry = server::run_telemetry_server(
        telemetry_listener,
        Arc::new(TelemetryState::new(meter, health)),
        shutdown.clone(),
    );

    tokio::try_join!(dashboard, telemetry)?;

    info!("Shutdown complete");
    Ok(())
}

// =============================================================================
// Shutdown
// =============================================================================

fn spawn_signal_handler(shutdown: CancellationToken, health: Arc<HealthCheck>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for interrupt: {}", e);
            return;
        }
        info!("Received interrupt, shutting down");
        health.set_live(false);
        shutdown.cancel();
    });
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "hyper_util=warn"] {
        if let Ok(d) = directive.parse() {
            filter = filter.add_directive(d);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
