//! Axum router wiring.
//!
//! Ops endpoints are plain routes; everything else falls through to the
//! configured handler chains.

use axum::{routing::get, Router};

use crate::{app_state::AppState, ops, transport};

pub fn build_router(state: AppState) -> Router {
    let metrics_path = state.cfg().metrics.path.clone();
    Router::new()
        .route("/healthz", get(ops::healthz))
        .route(&metrics_path, get(ops::metrics))
        .fallback(transport::http::serve_chain)
        .with_state(state)
}
