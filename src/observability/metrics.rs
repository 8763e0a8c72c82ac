//! Metrics collection and exposition.
//!
//! # Metrics
//! - `body_parser_requests_total` (counter): parsed bodies by kind and outcome
//! - `body_parser_body_bytes` (histogram): size of accumulated bodies
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed (tests, library use)
//! - The binary installs a Prometheus exporter when enabled in config

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Count one body parse attempt.
pub fn record_body_outcome(kind: &'static str, outcome: &'static str) {
    metrics::counter!("body_parser_requests_total", "kind" => kind, "outcome" => outcome)
        .increment(1);
}

/// Record the size of an accumulated body.
pub fn record_body_size(bytes: usize) {
    metrics::histogram!("body_parser_body_bytes").record(bytes as f64);
}
