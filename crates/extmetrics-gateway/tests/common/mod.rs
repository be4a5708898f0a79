//! Shared helpers for gateway integration tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use bytes::Bytes;

use extmetrics_core::error::{ExtMetricsError, Result};
use extmetrics_gateway::obs::HttpMetrics;
use extmetrics_gateway::pipeline::{Handler, Instrumentor, Next, ResponseWriter};

/// In-memory writer.
#[derive(Default)]
pub struct BufferWriter {
    pub headers: HeaderMap,
    pub status: Option<StatusCode>,
    pub heads: usize,
    pub body: Vec<u8>,
    /// Fail every body write, as if the client went away.
    pub broken: bool,
}

#[async_trait]
impl ResponseWriter for BufferWriter {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    async fn write_head(&mut self, status: StatusCode) -> Result<()> {
        self.heads += 1;
        self.status = Some(status);
        Ok(())
    }

    async fn write(&mut self, chunk: Bytes) -> Result<()> {
        if self.broken {
            return Err(ExtMetricsError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "client gone",
            )));
        }
        self.body.extend_from_slice(&chunk);
        Ok(())
    }
}

/// One step of a scripted handler.
#[derive(Clone)]
pub enum Step {
    Head(u16),
    Body(&'static str),
    Sleep(u64),
    Fail(Option<u16>),
    Panic,
    /// Store the in-flight gauge for host "h" into the cell.
    ReadInFlight(Arc<HttpMetrics>, Arc<AtomicI64>),
}

pub struct Script(pub Vec<Step>);

#[async_trait]
impl Handler for Script {
    fn name(&self) -> &'static str {
        "script"
    }

    async fn serve(
        &self,
        w: &mut dyn ResponseWriter,
        _req: &mut Request<Body>,
        _next: Next<'_>,
    ) -> Result<()> {
        for step in &self.0 {
            match step {
                Step::Head(s) => w.write_head(StatusCode::from_u16(*s).unwrap()).await?,
                Step::Body(b) => w.write(Bytes::copy_from_slice(b.as_bytes())).await?,
                Step::Sleep(ms) => tokio::time::sleep(Duration::from_millis(*ms)).await,
                Step::Fail(Some(status)) => {
                    return Err(ExtMetricsError::handler(*status, "scripted failure"))
                }
                Step::Fail(None) => return Err(ExtMetricsError::Internal("scripted failure".into())),
                Step::Panic => panic!("scripted panic"),
                Step::ReadInFlight(m, out) => {
                    out.store(m.requests_in_flight.get(&[("host", "h")]), Ordering::SeqCst)
                }
            }
        }
        Ok(())
    }
}

pub fn request(method: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri("/x")
        .header("host", "h")
        .body(Body::empty())
        .unwrap()
}

pub fn chain(metrics: &Arc<HttpMetrics>, steps: Vec<Step>) -> Vec<Arc<dyn Handler>> {
    vec![
        Arc::new(Instrumentor::new(Arc::clone(metrics))),
        Arc::new(Script(steps)),
    ]
}

/// Run `steps` behind the instrumentor with a GET request.
pub async fn run(metrics: &Arc<HttpMetrics>, steps: Vec<Step>) -> (BufferWriter, Result<()>) {
    let chain = chain(metrics, steps);
    let mut w = BufferWriter::default();
    let mut req = request("GET");
    let res = Next::new(&chain).run(&mut w, &mut req).await;
    (w, res)
}

pub const HOST: [(&str, &str); 1] = [("host", "h")];

pub fn http_labels<'a>(code: &'a str, method: &'a str) -> [(&'a str, &'a str); 3] {
    [("host", "h"), ("code", code), ("method", method)]
}
