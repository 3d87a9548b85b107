//! Dashboard Server
//!
//! Single route: `GET /` samples the host and renders the template.

use std::convert::Infallible;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::{Method, Request, StatusCode};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::{response, serve, text, HttpResponse};
use crate::dashboard::DashboardTemplate;
use crate::error::Result;
use crate::metrics::Sampler;

const HTML: &str = "text/html; charset=utf-8";

/// State shared by every dashboard request.
#[derive(Debug)]
pub struct DashboardState {
    sampler: Arc<Sampler>,
    template: DashboardTemplate,
}

impl DashboardState {
    pub fn new(sampler: Arc<Sampler>, template: DashboardTemplate) -> Self {
        Self { sampler, template }
    }

    /// Route a request by method and path.
    pub async fn respond(&self, method: &Method, path: &str) -> HttpResponse {
        if path != "/" {
            return text(StatusCode::NOT_FOUND, "not found");
        }
        if *method != Method::GET {
            let mut resp = text(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
            resp.headers_mut()
                .insert(hyper::header::ALLOW, hyper::header::HeaderValue::from_static("GET"));
            return resp;
        }

        match self.sampler.sample_async().await {
            Ok(metrics) => response(StatusCode::OK, HTML, self.template.render(&metrics)),
            Err(e) => {
                error!(error = %e, "Failed to sample host metrics");
                text(StatusCode::INTERNAL_SERVER_ERROR, "sampling failed")
            }
        }
    }
}

async fn handle(
    state: Arc<DashboardState>,
    req: Request<Incoming>,
) -> std::result::Result<HttpResponse, Infallible> {
    let resp = state.respond(req.method(), req.uri().path()).await;
    info!("[{}] {}  {}", req.method(), resp.status().as_u16(), req.uri());
    Ok(resp)
}

/// Serve the dashboard until `shutdown` fires.
pub async fn run_dashboard_server(
    listener: TcpListener,
    state: Arc<DashboardState>,
    shutdown: CancellationToken,
) -> Result<()> {
    serve("Dashboard", listener, shutdown, move |req| {
        handle(Arc::clone(&state), req)
    })
    .await
}
