//! Transport layer (HTTP).
//!
//! Bridges axum requests into handler chains with a streaming writer, so the
//! response head reaches hyper as soon as a handler emits it.

pub mod http;
