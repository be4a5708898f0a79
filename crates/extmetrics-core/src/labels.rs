//! Bounded label values for HTTP metrics.
//!
//! Both sanitizers are total and deterministic, and the set of values they
//! can produce is finite, so they are safe to use as Prometheus label values
//! regardless of what clients send.

/// Methods that keep their own label value. Everything else is `OTHER`.
const KNOWN_METHODS: [&str; 9] = [
    "GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "CONNECT", "OPTIONS", "TRACE",
];

/// Label value used for non-standard methods.
pub const OTHER_METHOD: &str = "OTHER";

/// Label value used for out-of-range status codes.
pub const OTHER_CODE: &str = "other";

/// Map an HTTP method to a bounded label value.
///
/// Matching is case-insensitive; the returned value is always uppercase.
pub fn sanitize_method(method: &str) -> &'static str {
    KNOWN_METHODS
        .iter()
        .find(|m| m.eq_ignore_ascii_case(method))
        .copied()
        .unwrap_or(OTHER_METHOD)
}

/// Map a numeric status code to a bounded label value.
///
/// `0` means nothing was written; such responses are served as `200`, so the
/// label says so.
pub fn sanitize_code(status: u16) -> String {
    match status {
        0 => "200".to_string(),
        100..=599 => status.to_string(),
        _ => OTHER_CODE.to_string(),
    }
}
