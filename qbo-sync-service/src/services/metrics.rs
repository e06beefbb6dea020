//! Prometheus metrics for qbo-sync-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

/// Counter for sync runs by outcome.
pub static SYNC_RUNS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "qbo_sync_runs_total",
        "Total number of sync runs",
        &["status"]
    )
    .expect("Failed to register SYNC_RUNS")
});

/// Histogram for sync phase duration.
pub static SYNC_PHASE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "qbo_sync_phase_duration_seconds",
        "Duration of each sync phase in seconds",
        &["phase"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("Failed to register SYNC_PHASE_DURATION")
});

/// Counter for which P&L source produced the entries.
pub static PL_SOURCE: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "qbo_sync_pl_source_total",
        "P&L data source used per sync run",
        &["source"]
    )
    .expect("Failed to register PL_SOURCE")
});

/// Counter for outbound QuickBooks API requests.
pub static QBO_REQUESTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "qbo_sync_api_requests_total",
        "Total number of QuickBooks API requests",
        &["endpoint", "status"]
    )
    .expect("Failed to register QBO_REQUESTS")
});

/// Histogram for database query duration.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "qbo_sync_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Counter for errors.
pub static ERRORS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "qbo_sync_errors_total",
        "Total number of errors",
        &["error_type"]
    )
    .expect("Failed to register ERRORS")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&SYNC_RUNS);
    Lazy::force(&SYNC_PHASE_DURATION);
    Lazy::force(&PL_SOURCE);
    Lazy::force(&QBO_REQUESTS);
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&ERRORS);
}

/// Get all metrics as Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Record an error.
pub fn record_error(error_type: &str) {
    ERRORS.with_label_values(&[error_type]).inc();
}
