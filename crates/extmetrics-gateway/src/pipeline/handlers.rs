//! Built-in directives and the directive -> handler compiler.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use axum::http::{Request, StatusCode};
use bytes::Bytes;

use extmetrics_core::directive::Directive;
use extmetrics_core::error::{ExtMetricsError, Result};

use super::instrument::{self, Instrumentor};
use super::{Handler, Next, ResponseWriter};
use crate::obs::HttpMetrics;

/// Compile one directive into a handler.
pub fn compile(d: &Directive, metrics: &Arc<HttpMetrics>) -> Result<Arc<dyn Handler>> {
    let h: Arc<dyn Handler> = match d.name.as_str() {
        instrument::DIRECTIVE => Arc::new(Instrumentor::from_directive(d, Arc::clone(metrics))?),
        "respond" => Arc::new(Respond::from_directive(d)?),
        "error" => Arc::new(StaticError::from_directive(d)?),
        "header" => Arc::new(SetHeader::from_directive(d)?),
        "abort" => {
            d.expect_no_args()?;
            Arc::new(Abort)
        }
        other => return Err(ExtMetricsError::UnknownDirective(other.to_string())),
    };
    Ok(h)
}

fn parse_status(d: &Directive, idx: usize) -> Result<StatusCode> {
    let raw = d.arg(idx)?;
    raw.parse::<u16>()
        .ok()
        .and_then(|c| StatusCode::from_u16(c).ok())
        .ok_or_else(|| d.arg_err(raw))
}

/// `respond <status> [body]`: terminal static response.
pub struct Respond {
    status: StatusCode,
    body: Bytes,
}

impl Respond {
    pub fn from_directive(d: &Directive) -> Result<Self> {
        d.expect_at_most(2)?;
        let status = parse_status(d, 0)?;
        let body = d.args.get(1).cloned().unwrap_or_default();
        Ok(Self {
            status,
            body: Bytes::from(body),
        })
    }
}

#[async_trait]
impl Handler for Respond {
    fn name(&self) -> &'static str {
        "respond"
    }

    async fn serve(
        &self,
        w: &mut dyn ResponseWriter,
        _req: &mut Request<Body>,
        _next: Next<'_>,
    ) -> Result<()> {
        if !self.body.is_empty() && !w.headers_mut().contains_key(CONTENT_TYPE) {
            w.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            );
        }
        w.write_head(self.status).await?;
        if !self.body.is_empty() {
            w.write(self.body.clone()).await?;
        }
        Ok(())
    }
}

/// `error <status> [message]`: fails the request with a status-carrying error.
pub struct StaticError {
    status: u16,
    message: String,
}

impl StaticError {
    pub fn from_directive(d: &Directive) -> Result<Self> {
        d.expect_at_most(2)?;
        let status = parse_status(d, 0)?;
        let message = match d.args.get(1) {
            Some(m) => m.clone(),
            None => status.canonical_reason().unwrap_or("error").to_string(),
        };
        Ok(Self {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl Handler for StaticError {
    fn name(&self) -> &'static str {
        "error"
    }

    async fn serve(
        &self,
        _w: &mut dyn ResponseWriter,
        _req: &mut Request<Body>,
        _next: Next<'_>,
    ) -> Result<()> {
        Err(ExtMetricsError::handler(self.status, self.message.clone()))
    }
}

/// `header <name> <value>`: sets a response header and continues.
pub struct SetHeader {
    name: HeaderName,
    value: HeaderValue,
}

impl SetHeader {
    pub fn from_directive(d: &Directive) -> Result<Self> {
        d.expect_at_most(2)?;
        let raw_name = d.arg(0)?;
        let raw_value = d.arg(1)?;
        let name = HeaderName::from_bytes(raw_name.as_bytes()).map_err(|_| d.arg_err(raw_name))?;
        let value = HeaderValue::from_str(raw_value).map_err(|_| d.arg_err(raw_value))?;
        Ok(Self { name, value })
    }
}

#[async_trait]
impl Handler for SetHeader {
    fn name(&self) -> &'static str {
        "header"
    }

    async fn serve(
        &self,
        w: &mut dyn ResponseWriter,
        req: &mut Request<Body>,
        next: Next<'_>,
    ) -> Result<()> {
        w.headers_mut().insert(self.name.clone(), self.value.clone());
        next.run(w, req).await
    }
}

/// `abort`: drops the request with an error that carries no status.
pub struct Abort;

#[async_trait]
impl Handler for Abort {
    fn name(&self) -> &'static str {
        "abort"
    }

    async fn serve(
        &self,
        _w: &mut dyn ResponseWriter,
        _req: &mut Request<Body>,
        _next: Next<'_>,
    ) -> Result<()> {
        Err(ExtMetricsError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionAborted,
            "aborted by handler",
        )))
    }
}
