//! Prometheus `/metrics` endpoint.
//!
//! Enabled by the CLI's `--metrics-addr`. A long benchmark run can then be
//! watched while it is measuring: phase, batches in flight, batch latency.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use prometheus::{Encoder, TextEncoder};
use std::net::SocketAddr;
use tracing::{error, info};

use crate::metrics::REGISTRY;

/// Encode every registered collector in the Prometheus text format.
pub fn render() -> Result<(String, Vec<u8>), prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok((encoder.format_type().to_string(), buffer))
}

async fn metrics_handler() -> Response {
    match render() {
        Ok((content_type, body)) => {
            (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Router serving `GET /metrics`.
pub fn create_metrics_router() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Serve `/metrics` on `addr` in a background task.
///
/// Binding happens before returning so address errors surface to the caller.
pub async fn spawn_metrics_server(addr: SocketAddr) -> std::io::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, create_metrics_router()).await {
            error!(error = %e, "Metrics server stopped");
        }
    });

    info!(addr = %local_addr, "Metrics endpoint listening");
    Ok(local_addr)
}
