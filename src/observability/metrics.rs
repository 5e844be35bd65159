//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, route, status
//! - `http_request_duration_seconds` (histogram): latency distribution
//! - `upstream_calls_total` (counter): outbound calls by service, outcome
//! - `abuse_checks_total` (counter): rate-limit decisions by policy bucket, outcome
//! - `push_deliveries_total` (counter): push sends by outcome
//! - `webhook_relays_total` (counter): automation relays by outcome

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    let status = status.to_string();
    counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.clone()
    )
    .increment(1);
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_call(service: &str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("upstream_calls_total", "service" => service.to_string(), "outcome" => outcome)
        .increment(1);
}

pub fn record_abuse_check(policy: &'static str, outcome: &'static str) {
    counter!("abuse_checks_total", "policy" => policy, "outcome" => outcome)
        .increment(1);
}

pub fn record_push_delivery(outcome: &'static str) {
    counter!("push_deliveries_total", "outcome" => outcome).increment(1);
}

pub fn record_webhook_relay(outcome: &'static str) {
    counter!("webhook_relays_total", "outcome" => outcome).increment(1);
}
