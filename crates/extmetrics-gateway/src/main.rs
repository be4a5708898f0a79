//! extmetrics gateway
//!
//! - Config: `extmetrics.yaml`, or the path given as the first argument
//! - Routes: prefix-matched directive chains (`extend_metrics`, `respond`, ...)
//! - Ops: `/healthz`, Prometheus text on `metrics.path`
//! - Graceful shutdown on Ctrl-C

use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};

use extmetrics_gateway::{app_state, config, router};

const DEFAULT_CONFIG: &str = "extmetrics.yaml";

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let cfg = config::load_from_file(&path).expect("config load failed");
    let listen: SocketAddr = cfg
        .gateway
        .listen
        .parse()
        .expect("gateway.listen must be a valid SocketAddr");

    let state = app_state::AppState::new(cfg).expect("app state init failed");
    let app = router::build_router(state);

    tracing::info!(%listen, config = %path, "extmetrics-gateway starting");
    let listener = tokio::net::TcpListener::bind(listen).await.expect("failed to bind");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "ctrl_c handler failed; running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
