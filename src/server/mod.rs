//! HTTP servers
//!
//! - [`dashboard`] - `GET /` renders the latest snapshot as HTML
//! - [`telemetry`] - `/metrics` exposition plus health probes
//!
//! Both run the same hyper HTTP/1 accept loop and stop when the shared
//! cancellation token fires.

pub mod dashboard;
pub mod health;
pub mod telemetry;

use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};

pub use dashboard::{run_dashboard_server, DashboardState};
pub use health::{HealthCheck, HealthCheckResult, HealthResponse, HealthStatus};
pub use telemetry::{run_telemetry_server, TelemetryState};

/// Response type produced by every handler.
pub type HttpResponse = Response<Full<Bytes>>;

/// Bind a listener, mapping failures to a startup error.
pub async fn bind(name: &str, addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind {} server on {}: {}", name, addr, e)))
}

/// Build a response with a body and content type.
pub fn response(status: StatusCode, content_type: &str, body: impl Into<Bytes>) -> HttpResponse {
    let mut resp = Response::new(Full::new(body.into()));
    *resp.status_mut() = status;
    let value = HeaderValue::from_str(content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    resp.headers_mut().insert(CONTENT_TYPE, value);
    resp
}

/// Plain-text response.
pub fn text(status: StatusCode, body: impl Into<Bytes>) -> HttpResponse {
    response(status, "text/plain; charset=utf-8", body)
}

/// Pause after a failed `accept` so a persistent error such as `EMFILE`
/// does not spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accept connections until `shutdown` is cancelled.
///
/// Accept errors are logged and retried; only cancellation ends the loop.
pub async fn serve<F, Fut>(
    name: &'static str,
    listener: TcpListener,
    shutdown: CancellationToken,
    handler: F,
) -> Result<()>
where
    F: Fn(Request<Incoming>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<HttpResponse, Infallible>> + Send + 'static,
{
    info!("{} server listening on {}", name, listener.local_addr()?);

    let listener = &listener;
    accept_loop(
        name,
        shutdown,
        move || listener.accept(),
        |stream, peer| {
            debug!(%peer, "{} connection accepted", name);
            let io = TokioIo::new(stream);
            let handler = handler.clone();

            tokio::spawn(async move {
                if let Err(e) = http1::Builder::new()
                    .serve_connection(io, service_fn(handler))
                    .await
                {
                    error!("{} server connection error: {}", name, e);
                }
            });
        },
    )
    .await;

    info!("{} server shutting down", name);
    Ok(())
}

async fn accept_loop<S, A, AFut, C>(
    name: &str,
    shutdown: CancellationToken,
    mut accept: A,
    mut on_connection: C,
) where
    A: FnMut() -> AFut,
    AFut: Future<Output = io::Result<(S, SocketAddr)>>,
    C: FnMut(S, SocketAddr),
{
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            accepted = accept() => match accepted {
                Ok((stream, peer)) => on_connection(stream, peer),
                Err(e) => {
                    warn!("{} server accept error: {}", name, e);
                    tokio::select! {
                        _ = shutdown.cancelled() => return,
                        _ = tokio::time::sleep(ACCEPT_BACKOFF) => {}
                    }
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_headers() {
        let resp = text(StatusCode::NOT_FOUND, "not found");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            resp.headers()[CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );

        let resp = response(StatusCode::OK, "bad\nvalue", "x");
        assert_eq!(resp.headers()[CONTENT_TYPE], "application/octet-stream");
    }

    #[tokio::test]
    async fn test_accept_errors_do_not_stop_the_loop() {
        let peer = SocketAddr::from(([127, 0, 0, 1], 4000));
        let mut pending = vec![
            Ok((2u8, peer)),
            Err(io::Error::from(io::ErrorKind::ConnectionAborted)),
            Ok((1u8, peer)),
            Err(io::Error::from(io::ErrorKind::ConnectionReset)),
        ];

        let shutdown = CancellationToken::new();
        let mut accepted = Vec::new();
        let stop = shutdown.clone();

        accept_loop(
            "test",
            shutdown,
            move || {
                let next = pending.pop();
                async move {
                    match next {
                        Some(result) => result,
                        None => std::future::pending().await,
                    }
                }
            },
            |conn, _| {
                accepted.push(conn);
                if accepted.len() == 2 {
                    stop.cancel();
                }
            },
        )
        .await;

        assert_eq!(accepted, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_accept_loop_stops_during_backoff() {
        let shutdown = CancellationToken::new();
        let stop = shutdown.clone();
        let mut attempts = 0;

        accept_loop(
            "test",
            shutdown,
            move || {
                attempts += 1;
                if attempts == 2 {
                    stop.cancel();
                }
                async { Err::<((), SocketAddr), _>(io::Error::from(io::ErrorKind::Other)) }
            },
            |_, _| unreachable!("no connection is ever accepted"),
        )
        .await;
    }
}
