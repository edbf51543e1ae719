//! Metrics and observability utilities
//!
//! Prometheus metric names and recording helpers shared by the gateway
//! and the ingestion worker.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all PaperPulse metrics
pub const METRICS_PREFIX: &str = "paperpulse";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.00,
];

/// Buckets for ingestion runs, which are dominated by the feed fetch
pub const INGESTION_BUCKETS: &[f64] = &[0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of search queries"
    );

    describe_gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of results returned by the last search"
    );

    describe_counter!(
        format!("{}_ingestion_runs_total", METRICS_PREFIX),
        Unit::Count,
        "Total ingestion runs"
    );

    describe_counter!(
        format!("{}_papers_ingested_total", METRICS_PREFIX),
        Unit::Count,
        "Papers handed to the store, by outcome"
    );

    describe_histogram!(
        format!("{}_ingestion_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Ingestion run latency in seconds"
    );

    describe_counter!(
        format!("{}_feed_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Failed feed fetches"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record one search query and its result count
pub fn record_search(result_count: usize) {
    counter!(format!("{}_search_queries_total", METRICS_PREFIX)).increment(1);
    gauge!(format!("{}_search_results_count", METRICS_PREFIX)).set(result_count as f64);
}

/// Record a finished ingestion run
pub fn record_ingestion(duration_secs: f64, inserted: usize, duplicates: usize, failed: usize) {
    counter!(format!("{}_ingestion_runs_total", METRICS_PREFIX)).increment(1);

    for (outcome, count) in [
        ("inserted", inserted),
        ("duplicate", duplicates),
        ("failed", failed),
    ] {
        counter!(
            format!("{}_papers_ingested_total", METRICS_PREFIX),
            "outcome" => outcome
        )
        .increment(count as u64);
    }

    histogram!(format!("{}_ingestion_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Record a failed feed fetch
pub fn record_feed_error() {
    counter!(format!("{}_feed_errors_total", METRICS_PREFIX)).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_are_sorted() {
        for buckets in [LATENCY_BUCKETS, INGESTION_BUCKETS] {
            assert!(buckets.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_recorders_run_without_exporter() {
        let metrics = RequestMetrics::start("GET", "/api/trends");
        metrics.finish(200);
        record_search(3);
        record_ingestion(1.5, 2, 1, 0);
        record_feed_error();
    }
}
