//! extmetrics gateway library entry.
//!
//! This crate wires the metrics registry, the handler pipeline (including
//! the `extend_metrics` request instrumentor), config, and the HTTP
//! transport into a small gateway. It is consumed by the binary (`main.rs`)
//! and by integration tests.

pub mod app_state;
pub mod config;
pub mod obs;
pub mod ops;
pub mod pipeline;
pub mod router;
pub mod transport;
