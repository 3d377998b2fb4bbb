//! Prometheus metrics recording.

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Records HTTP request metrics.
pub fn record_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];
    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Records one completed search against the index of the given kind.
pub fn record_search(index: &'static str, duration: Duration) {
    counter!("retrieval_search_total", "index" => index).increment(1);
    histogram!("retrieval_search_duration_seconds", "index" => index)
        .record(duration.as_secs_f64());
}

/// Updates the `retrieval_records_total` gauge.
pub fn set_records_total(count: usize) {
    gauge!("retrieval_records_total").set(count as f64);
}
