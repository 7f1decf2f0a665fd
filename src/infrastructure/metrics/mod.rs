//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - HTTP request counts by method, path, and status
//! - HTTP request latency histograms
//! - Room lock wait time by operation
//! - Room mutation outcomes by operation

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// HTTP request counter - tracks total requests by method, path, and status code
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests")
            .namespace("chat_rooms"),
        &["method", "path", "status"],
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric")
});

/// HTTP request latency histogram - tracks request duration in seconds
pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
    HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        )
        .namespace("chat_rooms")
        .buckets(buckets),
        &["method", "path"],
    )
    .expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric")
});

/// Time spent waiting for a room's exclusive section
pub static ROOM_LOCK_WAIT_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0];
    HistogramVec::new(
        HistogramOpts::new(
            "room_lock_wait_seconds",
            "Time spent acquiring a room lock in seconds",
        )
        .namespace("chat_rooms")
        .buckets(buckets),
        &["operation"], // "join", "leave", "post"
    )
    .expect("Failed to create ROOM_LOCK_WAIT_SECONDS metric")
});

/// Room mutation counter by operation and outcome
pub static ROOM_MUTATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("room_mutations_total", "Room mutations by operation and outcome")
            .namespace("chat_rooms"),
        &["operation", "outcome"],
    )
    .expect("Failed to create ROOM_MUTATIONS_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("Failed to register HTTP_REQUESTS_TOTAL");
    registry
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");
    registry
        .register(Box::new(ROOM_LOCK_WAIT_SECONDS.clone()))
        .expect("Failed to register ROOM_LOCK_WAIT_SECONDS");
    registry
        .register(Box::new(ROOM_MUTATIONS_TOTAL.clone()))
        .expect("Failed to register ROOM_MUTATIONS_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Helper to record HTTP request metrics
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status = status.to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, status.as_str()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

/// Helper to record how long an operation waited for its room lock
pub fn record_lock_wait(operation: &str, duration_secs: f64) {
    ROOM_LOCK_WAIT_SECONDS
        .with_label_values(&[operation])
        .observe(duration_secs);
}

/// Helper to record the outcome of a room mutation
pub fn record_mutation(operation: &str, outcome: &str) {
    ROOM_MUTATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}
