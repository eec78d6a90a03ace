//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method and status
//! - `gateway_security_rejections_total` (counter): requests refused by the
//!   security stage before reaching the router

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus scrape endpoint. Must run inside the runtime.
pub fn init_metrics(address: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(address).install() {
        Ok(()) => tracing::info!(address = %address, "metrics endpoint started"),
        Err(err) => tracing::error!(address = %address, error = %err, "failed to start metrics endpoint"),
    }
}

/// Count one completed request.
pub fn record_request(method: &str, status: u16) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Count one request rejected by the security stage.
pub fn record_security_rejection() {
    metrics::counter!("gateway_security_rejections_total").increment(1);
}
