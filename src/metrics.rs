//! Metrics and telemetry for Canopy
//!
//! Prometheus metrics for query volume, latency and excluded readings.
//! Registered once in the default registry and exposed by `/metrics`.

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

lazy_static! {
    /// Total queries by reducer and outcome
    pub static ref QUERIES_TOTAL: CounterVec = register_counter_vec!(
        "canopy_queries_total",
        "Total queries by reducer and status",
        &["reducer", "status"]
    ).unwrap();

    /// Query duration by reducer
    pub static ref QUERY_DURATION: HistogramVec = register_histogram_vec!(
        "canopy_query_duration_seconds",
        "Query latency in seconds",
        &["reducer"],
        vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]
    ).unwrap();

    /// Readings dropped by the range validator
    pub static ref READINGS_EXCLUDED: CounterVec = register_counter_vec!(
        "canopy_readings_excluded_total",
        "Readings excluded as out-of-range noise",
        &["metric"]
    ).unwrap();
}

/// Record the outcome of one query
pub fn record_query(reducer: &str, success: bool, elapsed_secs: f64) {
    let status = if success { "ok" } else { "error" };
    QUERIES_TOTAL.with_label_values(&[reducer, status]).inc();
    QUERY_DURATION
        .with_label_values(&[reducer])
        .observe(elapsed_secs);
}

/// Render every registered metric in the Prometheus text format
pub fn gather_text() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_query_shows_up_in_text() {
        record_query("list", true, 0.002);
        let text = gather_text();
        assert!(text.contains("canopy_queries_total"));
        assert!(text.contains("canopy_query_duration_seconds"));
    }
}
