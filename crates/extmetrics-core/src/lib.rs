//! extmetrics core: transport-agnostic primitives shared by the gateway.
//!
//! This crate defines the error surface, the bounded label sanitizers used
//! by the HTTP metrics, and the directive tokenizer used by the config
//! layer. It has no HTTP or async runtime dependencies; `thiserror` backs the
//! error type and `tracing` is used for diagnostics only, so the label and
//! error contracts can be reused outside the gateway.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths surface as `ExtMetricsError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod directive;
pub mod error;
pub mod labels;

/// Shared result type.
pub use error::{ExtMetricsError, Result};
