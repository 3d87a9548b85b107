//! Telemetry Server
//!
//! `/metrics` serves the Prometheus exposition of the metrics pipeline.
//! `/healthz`, `/livez`, `/readyz` and `/health` report process health as JSON.

use std::convert::Infallible;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::{Method, Request, StatusCode};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::health::{HealthCheck, HealthStatus};
use super::{response, serve, text, HttpResponse};
use crate::adapters::PrometheusMeter;
use crate::error::{Error, Result};

const JSON: &str = "application/json";

/// State shared by every telemetry request.
#[derive(Debug)]
pub struct TelemetryState {
    meter: Arc<PrometheusMeter>,
    health: Arc<HealthCheck>,
}

impl TelemetryState {
    pub fn new(meter: Arc<PrometheusMeter>, health: Arc<HealthCheck>) -> Self {
        Self { meter, health }
    }

    /// Route a request by method and path.
    pub async fn respond(&self, method: &Method, path: &str) -> HttpResponse {
        if *method != Method::GET {
            return text(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
        }

        match path {
            "/metrics" => self.metrics().await,
            "/healthz" | "/livez" => {
                let check = self.health.liveness_check();
                json(status_code(check.status), &check)
            }
            "/readyz" => {
                let check = self.health.readiness_check();
                json(status_code(check.status), &check)
            }
            "/health" => {
                let report = self.health.check_all();
                json(status_code(report.status), &report)
            }
            _ => text(StatusCode::NOT_FOUND, "not found"),
        }
    }

    async fn metrics(&self) -> HttpResponse {
        // Gathering runs the observation callback, which blocks for the CPU window
        let meter = Arc::clone(&self.meter);
        let encoded = tokio::task::spawn_blocking(move || meter.encode_text())
            .await
            .map_err(|e| Error::Internal(format!("Gather task failed: {}", e)))
            .and_then(|r| r);

        match encoded {
            Ok(body) => {
                debug!(bytes = body.len(), "Served metrics scrape");
                response(StatusCode::OK, &self.meter.content_type(), body)
            }
            Err(e) => {
                error!(error = %e, "Failed to encode metrics");
                text(StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics")
            }
        }
    }
}

fn status_code(status: HealthStatus) -> StatusCode {
    if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

fn json<T: Serialize>(status: StatusCode, value: &T) -> HttpResponse {
    match serde_json::to_string(value) {
        Ok(body) => response(status, JSON, body),
        Err(e) => {
            error!(error = %e, "Failed to serialize health response");
            text(StatusCode::INTERNAL_SERVER_ERROR, "serialization failed")
        }
    }
}

async fn handle(
    state: Arc<TelemetryState>,
    req: Request<Incoming>,
) -> std::result::Result<HttpResponse, Infallible> {
    let resp = state.respond(req.method(), req.uri().path()).await;
    debug!("[{}] {}  {}", req.method(), resp.status().as_u16(), req.uri());
    Ok(resp)
}

/// Serve telemetry endpoints until `shutdown` fires.
pub async fn run_telemetry_server(
    listener: TcpListener,
    state: Arc<TelemetryState>,
    shutdown: CancellationToken,
) -> Result<()> {
    serve("Telemetry", listener, shutdown, move |req| {
        handle(Arc::clone(&state), req)
    })
    .await
}
