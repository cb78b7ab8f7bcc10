//! Prometheus metrics for a harness run
//!
//! Exposes metrics for:
//! - Scenario outcomes
//! - JSON-RPC submissions and node-side rejections
//! - Submission latency
//!
//! A run is short-lived, so metrics are written once at the end in text
//! exposition format for a node-exporter textfile collector.

use crate::error::{HarnessError, HarnessResult};

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use std::path::Path;
use tracing::info;

lazy_static! {
    pub static ref SCENARIOS: CounterVec = register_counter_vec!(
        "faultline_scenarios_total",
        "Scenarios executed by outcome",
        &["outcome"]
    ).unwrap();

    pub static ref RPC_SUBMISSIONS: CounterVec = register_counter_vec!(
        "faultline_rpc_submissions_total",
        "JSON-RPC submissions by method and shape",
        &["method", "shape"]
    ).unwrap();

    pub static ref RPC_REJECTIONS: CounterVec = register_counter_vec!(
        "faultline_rpc_rejections_total",
        "Error objects returned by the node",
        &["method"]
    ).unwrap();

    pub static ref COMPANIONS: CounterVec = register_counter_vec!(
        "faultline_companions_total",
        "Pre-send hook results",
        &["status"]
    ).unwrap();

    pub static ref RPC_LATENCY: HistogramVec = register_histogram_vec!(
        "faultline_rpc_latency_seconds",
        "Round trip time of JSON-RPC submissions",
        &["method"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ).unwrap();
}

/// Current registry contents in text exposition format
pub fn render() -> HarnessResult<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| HarnessError::Report(std::io::Error::other(e.to_string())))?;
    String::from_utf8(buffer)
        .map_err(|e| HarnessError::Report(std::io::Error::other(e.to_string())))
}

/// Write the registry to `path`, replacing any previous run's file
pub fn write_textfile(path: &Path) -> HarnessResult<()> {
    let body = render()?;
    std::fs::write(path, body)?;
    info!("Wrote metrics to {}", path.display());
    Ok(())
}

// Helper functions to record metrics

pub fn record_scenario(outcome: &str) {
    SCENARIOS.with_label_values(&[outcome]).inc();
}

pub fn record_submission(method: &str, batch: bool, latency_secs: f64) {
    let shape = if batch { "batch" } else { "single" };
    RPC_SUBMISSIONS.with_label_values(&[method, shape]).inc();
    RPC_LATENCY.with_label_values(&[method]).observe(latency_secs);
}

pub fn record_rejections(method: &str, count: usize) {
    if count > 0 {
        RPC_REJECTIONS
            .with_label_values(&[method])
            .inc_by(count as f64);
    }
}

pub fn record_companion(status: &str) {
    COMPANIONS.with_label_values(&[status]).inc();
}
