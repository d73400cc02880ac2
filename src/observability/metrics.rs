//! Metrics collection and exposition.
//!
//! # Metrics
//! - `portfolio_requests_total` (counter): requests by method, status
//! - `portfolio_request_duration_seconds` (histogram): latency distribution
//! - `portfolio_rejections_total` (counter): validation rejections by reason
//! - `portfolio_rate_limited_total` (counter): 429s by scope (global, client)
//! - `portfolio_in_flight_requests` (gauge): requests past the admission gate
//! - `portfolio_tracked_clients` (gauge): per-client buckets held
//! - `portfolio_operation_timeouts_total` (counter): bounded operations that timed out
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "portfolio_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("portfolio_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_rejection(reason: &'static str) {
    counter!("portfolio_rejections_total", "reason" => reason).increment(1);
}

pub fn record_rate_limited(scope: &'static str) {
    counter!("portfolio_rate_limited_total", "scope" => scope).increment(1);
}

pub fn record_in_flight(count: usize) {
    gauge!("portfolio_in_flight_requests").set(count as f64);
}

pub fn record_tracked_clients(count: usize) {
    gauge!("portfolio_tracked_clients").set(count as f64);
}

pub fn record_operation_timeout() {
    counter!("portfolio_operation_timeouts_total").increment(1);
}
