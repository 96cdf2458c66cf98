//! Metrics collection and exposition.
//!
//! # Metrics
//! - `hostbounce_requests_total` (counter): routing decisions by outcome
//!   (`matched`, `default`, `not_found`, `upstream_error`)
//! - `hostbounce_reloads_total` (counter): reload attempts by result
//!   (`accepted`, `rejected`, `skipped`)
//! - `hostbounce_cert_failures_total` (counter): per-host certificate load failures
//! - `hostbounce_config_version` (gauge): version of the published snapshot

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(outcome: &'static str) {
    metrics::counter!("hostbounce_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_reload(result: &'static str) {
    metrics::counter!("hostbounce_reloads_total", "result" => result).increment(1);
}

pub fn record_cert_failure() {
    metrics::counter!("hostbounce_cert_failures_total").increment(1);
}

pub fn record_config_version(version: u64) {
    metrics::gauge!("hostbounce_config_version").set(version as f64);
}
