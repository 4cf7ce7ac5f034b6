use crate::limiter::Outcome;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter_vec, Histogram, IntCounterVec,
};

lazy_static! {
    // Request metrics. A request let through by fail-open is labeled
    // "error_allowed", never "allowed": the allowed bucket must only
    // count requests the store actually admitted.
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests by path and rate-limit outcome",
        &["path", "outcome"]
    ).unwrap();

    // Store metrics
    pub static ref STORE_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "rate_limiter_store_errors_total",
        "Total number of bucket store errors",
        &["kind"]
    ).unwrap();

    pub static ref STORE_DURATION: Histogram = register_histogram!(
        "rate_limiter_store_duration_seconds",
        "Bucket store round-trip duration in seconds",
        vec![0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    ).unwrap();
}

/// Record a request outcome for a route
pub fn record_request(path: &str, outcome: Outcome) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[path, outcome.as_label()])
        .inc();
}

/// Record a bucket store error
pub fn record_store_error(kind: &str) {
    STORE_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

/// Record a bucket store round-trip duration
pub fn observe_store_duration(duration_secs: f64) {
    STORE_DURATION.observe(duration_secs);
}
