//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define service metrics (requests, rule fetches, transform failures)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `augment_requests_total` (counter): requests by outcome
//! - `augment_request_duration_seconds` (histogram): time to response headers
//! - `augment_rule_fetch_total` (counter): configuration fetches by result
//! - `augment_rules_loaded` (histogram): valid rules per fetched page
//! - `augment_rules_rejected_total` (counter): malformed rule records skipped
//! - `augment_transform_failures_total` (counter): rewrite failures by stage
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Labels are static strings to keep cardinality bounded

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished request.
pub fn record_request(outcome: &'static str, start: Instant) {
    metrics::counter!("augment_requests_total", "outcome" => outcome).increment(1);
    metrics::histogram!("augment_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

/// Record the result of a configuration fetch.
pub fn record_rule_fetch(result: &'static str) {
    metrics::counter!("augment_rule_fetch_total", "result" => result).increment(1);
}

/// Record how many valid rules a page had.
pub fn record_rules_loaded(count: usize) {
    metrics::histogram!("augment_rules_loaded").record(count as f64);
}

/// Record a malformed rule record that was skipped.
pub fn record_rule_rejected() {
    metrics::counter!("augment_rules_rejected_total").increment(1);
}

/// Record a transformation failure (`stream` or `end`).
pub fn record_transform_failure(stage: &'static str) {
    metrics::counter!("augment_transform_failures_total", "stage" => stage).increment(1);
}
