//! In-process HTTP metrics.
//!
//! `metrics` holds the label-vector primitives (atomics behind `DashMap`);
//! `http` declares the fixed instrument set recorded by the request
//! instrumentor and rendered by the `/metrics` handler.

pub mod http;
pub mod metrics;

pub use http::HttpMetrics;
