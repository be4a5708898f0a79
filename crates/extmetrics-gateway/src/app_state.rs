//! Shared application state for the extmetrics gateway.
//!
//! Built once at startup: the metrics registry is created here and handed to
//! every compiled `extend_metrics` handler, and each route's directive list
//! is compiled into a handler chain. Startup errors are returned, not
//! panicked.

use std::sync::Arc;

use extmetrics_core::directive::Directive;
use extmetrics_core::error::Result;

use crate::config::GatewayConfig;
use crate::obs::HttpMetrics;
use crate::pipeline::{handlers, Handler};

/// Compiled route: path prefix plus handler chain.
pub struct Route {
    pub prefix: String,
    pub chain: Arc<[Arc<dyn Handler>]>,
}

impl Route {
    /// Prefix match on whole path segments (`/api` matches `/api/x`, not `/apix`).
    pub fn matches(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || self.prefix.ends_with('/') || rest.starts_with('/'),
            None => false,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    metrics: Arc<HttpMetrics>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    // Longest prefix first.
    routes: Vec<Route>,
}

impl AppState {
    /// Build application state.
    /// Returns Result so main can handle errors gracefully (no panic).
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        let metrics = Arc::new(HttpMetrics::new());

        let mut routes = Vec::with_capacity(cfg.routes.len());
        for r in &cfg.routes {
            let mut chain: Vec<Arc<dyn Handler>> = Vec::with_capacity(r.handle.len());
            for line in &r.handle {
                let compiled =
                    Directive::parse(line).and_then(|d| handlers::compile(&d, &metrics));
                match compiled {
                    Ok(h) => chain.push(h),
                    Err(e) => {
                        tracing::error!(route = %r.path, directive = %line, error = %e, "directive rejected");
                        return Err(e);
                    }
                }
            }
            routes.push(Route {
                prefix: r.path.clone(),
                chain: chain.into(),
            });
        }
        routes.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));

        Ok(Self {
            inner: Arc::new(AppStateInner { cfg, routes }),
            metrics,
        })
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn metrics(&self) -> Arc<HttpMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Chain of the longest route prefix matching `path`.
    pub fn route(&self, path: &str) -> Option<Arc<[Arc<dyn Handler>]>> {
        self.inner
            .routes
            .iter()
            .find(|r| r.matches(path))
            .map(|r| Arc::clone(&r.chain))
    }
}
