//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method and final status
//! - `proxy_request_duration_seconds` (histogram): end-to-end latency
//! - `proxy_backend_retries_total` (counter): transient-error retries
//! - `proxy_backend_unreachable_total` (counter): transport failures
//! - `proxy_legacy_rewrites_total` (counter): legacy GET rewrites by route
//! - `proxy_fallback_dispatches_total` (counter): queued fallbacks by outcome
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("proxy_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_retry() {
    metrics::counter!("proxy_backend_retries_total").increment(1);
}

pub fn record_unreachable() {
    metrics::counter!("proxy_backend_unreachable_total").increment(1);
}

pub fn record_rewrite(route: &'static str) {
    metrics::counter!("proxy_legacy_rewrites_total", "route" => route).increment(1);
}

pub fn record_fallback(outcome: &'static str) {
    metrics::counter!("proxy_fallback_dispatches_total", "outcome" => outcome).increment(1);
}
