//! Handler pipeline.
//!
//! A route is an ordered chain of [`Handler`]s. Each handler receives the
//! response writer, the request, and a [`Next`] pointing at the rest of the
//! chain; it may respond, delegate, or both. An exhausted chain falls
//! through without writing anything.

pub mod handlers;
pub mod instrument;
pub mod recorder;
pub mod size;

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use bytes::Bytes;

use extmetrics_core::error::Result;

pub use instrument::Instrumentor;
pub use recorder::{HeadCapture, ResponseRecorder, TtfbObserver};

/// Streaming response sink.
///
/// The head is sent by the first `write_head`, or implicitly as `200 OK` by
/// the first `write`. Headers must be set before that.
#[async_trait]
pub trait ResponseWriter: Send {
    fn headers_mut(&mut self) -> &mut HeaderMap;
    async fn write_head(&mut self, status: StatusCode) -> Result<()>;
    async fn write(&mut self, chunk: Bytes) -> Result<()>;
}

/// One link of a route's chain.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Directive name, for logs.
    fn name(&self) -> &'static str;

    async fn serve(
        &self,
        w: &mut dyn ResponseWriter,
        req: &mut Request<Body>,
        next: Next<'_>,
    ) -> Result<()>;
}

/// Remainder of a chain.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    chain: &'a [Arc<dyn Handler>],
}

impl<'a> Next<'a> {
    pub fn new(chain: &'a [Arc<dyn Handler>]) -> Self {
        Self { chain }
    }

    /// Run the next handler, or fall through if none is left.
    pub async fn run(self, w: &mut dyn ResponseWriter, req: &mut Request<Body>) -> Result<()> {
        match self.chain.split_first() {
            Some((h, rest)) => {
                tracing::trace!(handler = h.name(), "serve");
                h.serve(w, req, Next { chain: rest }).await
            }
            None => Ok(()),
        }
    }
}
