//! Prometheus metrics for the worker.

use std::net::SocketAddr;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Metric names as constants for consistency.
pub mod names {
    pub const MESSAGES_PROCESSED_TOTAL: &str = "cwave_messages_processed_total";
    pub const MESSAGES_FAILED_TOTAL: &str = "cwave_messages_failed_total";
    pub const DECODE_FAILURES_TOTAL: &str = "cwave_decode_failures_total";
    pub const EMPTY_POLLS_TOTAL: &str = "cwave_empty_polls_total";
    pub const PIPELINE_DURATION_SECONDS: &str = "cwave_pipeline_duration_seconds";
}

/// Install the Prometheus recorder with an HTTP scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("Failed to install Prometheus recorder");
}

/// Record a successfully processed message.
pub fn record_message_processed(duration_secs: f64) {
    counter!(names::MESSAGES_PROCESSED_TOTAL).increment(1);
    histogram!(names::PIPELINE_DURATION_SECONDS).record(duration_secs);
}

/// Record a failed message with the stage it failed in.
pub fn record_message_failed(stage: &'static str) {
    counter!(names::MESSAGES_FAILED_TOTAL, "stage" => stage).increment(1);
}

/// Record an unprocessable message.
pub fn record_decode_failure() {
    counter!(names::DECODE_FAILURES_TOTAL).increment(1);
}

/// Record a poll that returned no messages.
pub fn record_empty_poll() {
    counter!(names::EMPTY_POLLS_TOTAL).increment(1);
}
