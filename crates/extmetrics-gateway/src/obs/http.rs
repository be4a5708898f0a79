//! HTTP request instruments.
//!
//! The instrument set is fixed when `HttpMetrics` is built: names, label
//! schemas, and buckets never change afterwards. Build it once during
//! startup and share it through `Arc`.

use super::metrics::{
    CounterVec, GaugeVec, HistogramVec, DEFAULT_DURATION_BUCKETS,
};

pub const NAMESPACE: &str = "extmetrics";
pub const SUBSYSTEM: &str = "http";

/// Labels for per-host instruments.
pub const BASIC_LABELS: &[&str] = &["host"];
/// Labels for per-response instruments.
pub const HTTP_LABELS: &[&str] = &["host", "code", "method"];

/// Byte buckets: `exponential_buckets(256, 4, 8)`.
pub const SIZE_BUCKETS: [f64; 8] = [
    256.0, 1024.0, 4096.0, 16384.0, 65536.0, 262144.0, 1048576.0, 4194304.0,
];

fn fq_name(name: &str) -> String {
    format!("{NAMESPACE}_{SUBSYSTEM}_{name}")
}

pub struct HttpMetrics {
    pub requests_in_flight: GaugeVec,
    pub requests_total: CounterVec,
    pub request_errors: CounterVec,
    pub request_duration: HistogramVec,
    pub request_size: HistogramVec,
    pub response_size: HistogramVec,
    /// Time to first byte.
    pub response_duration: HistogramVec,
}

impl Default for HttpMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpMetrics {
    pub fn new() -> Self {
        // Start, factor and count above are always a valid schema.
        Self {
            requests_in_flight: GaugeVec::new(
                fq_name("requests_in_flight"),
                "Number of requests currently handled by this server.",
                BASIC_LABELS,
            ),
            requests_total: CounterVec::new(
                fq_name("requests_total"),
                "Counter of HTTP(S) requests made.",
                BASIC_LABELS,
            ),
            request_errors: CounterVec::new(
                fq_name("request_errors_total"),
                "Number of requests resulting in middleware errors.",
                BASIC_LABELS,
            ),
            request_duration: HistogramVec::new(
                fq_name("request_duration_seconds"),
                "Histogram of round-trip request durations.",
                HTTP_LABELS,
                &DEFAULT_DURATION_BUCKETS,
            ),
            request_size: HistogramVec::new(
                fq_name("request_size_bytes"),
                "Total size of the request. Includes body.",
                HTTP_LABELS,
                &SIZE_BUCKETS,
            ),
            response_size: HistogramVec::new(
                fq_name("response_size_bytes"),
                "Size of the returned response.",
                HTTP_LABELS,
                &SIZE_BUCKETS,
            ),
            response_duration: HistogramVec::new(
                fq_name("response_duration_seconds"),
                "Histogram of times to first byte in response bodies.",
                HTTP_LABELS,
                &DEFAULT_DURATION_BUCKETS,
            ),
        }
    }

    /// Render all instruments in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.requests_in_flight.render(&mut out);
        self.requests_total.render(&mut out);
        self.request_errors.render(&mut out);
        self.request_duration.render(&mut out);
        self.request_size.render(&mut out);
        self.response_size.render(&mut out);
        self.response_duration.render(&mut out);
        out
    }
}
