//! Top-level facade crate for extmetrics.
//!
//! Re-exports core types and the gateway library so users can depend on a single crate.

pub mod core {
    pub use extmetrics_core::*;
}

pub mod gateway {
    pub use extmetrics_gateway::*;
}
