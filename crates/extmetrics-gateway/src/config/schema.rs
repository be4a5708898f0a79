use serde::Deserialize;
use extmetrics_core::error::{ExtMetricsError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub metrics: MetricsSection,

    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ExtMetricsError::BadConfig(format!(
                "unsupported config version: {}",
                self.version
            )));
        }
        if self.routes.is_empty() {
            return Err(ExtMetricsError::BadConfig("routes must not be empty".into()));
        }

        self.metrics.validate()?;
        for r in &self.routes {
            r.validate()?;
            if r.path == self.metrics.path {
                return Err(ExtMetricsError::BadConfig(format!(
                    "route {} shadows the metrics endpoint",
                    r.path
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            path: default_metrics_path(),
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        if !self.path.starts_with('/') {
            return Err(ExtMetricsError::BadConfig(
                "metrics.path must start with '/'".into(),
            ));
        }
        if self.path == "/healthz" {
            return Err(ExtMetricsError::BadConfig(
                "metrics.path collides with /healthz".into(),
            ));
        }
        Ok(())
    }
}

fn default_metrics_path() -> String {
    "/metrics".into()
}

/// One prefix-matched route and its directive chain.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteConfig {
    pub path: String,
    pub handle: Vec<String>,
}

impl RouteConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.path.starts_with('/') {
            return Err(ExtMetricsError::BadConfig(format!(
                "route path must start with '/': {}",
                self.path
            )));
        }
        if self.handle.is_empty() {
            return Err(ExtMetricsError::BadConfig(format!(
                "route {} has no handle directives",
                self.path
            )));
        }
        Ok(())
    }
}
