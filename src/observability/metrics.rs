//! Metrics collection and exposition.
//!
//! # Metrics
//! - `frontend_connections_accepted_total` (counter): connections by transport
//! - `frontend_handshake_failures_total` (counter): dropped handshakes by transport
//! - `frontend_route_decisions_total` (counter): routing outcomes by service
//! - `frontend_requests_total` (counter): requests by route and status
//! - `frontend_request_duration_seconds` (histogram): dispatch latency

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`. Must run inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connection_accepted(transport: &'static str) {
    counter!("frontend_connections_accepted_total", "transport" => transport).increment(1);
}

pub fn record_handshake_failure(transport: &'static str) {
    counter!("frontend_handshake_failures_total", "transport" => transport).increment(1);
}

/// `outcome` is one of `strategy`, `fallback`, `unavailable`.
pub fn record_route_decision(service: &str, outcome: &'static str) {
    counter!(
        "frontend_route_decisions_total",
        "service" => service.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_request(route: &str, status: &'static str, start: Instant) {
    counter!(
        "frontend_requests_total",
        "route" => route.to_string(),
        "status" => status
    )
    .increment(1);
    histogram!("frontend_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}
