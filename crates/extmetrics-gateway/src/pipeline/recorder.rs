//! Pass-through response recorder.
//!
//! Wraps a [`ResponseWriter`], forwarding everything immediately (never
//! buffering) while remembering the head-phase status, the instant the head
//! went out, and how many body bytes were written. When bound to a TTFB
//! series, the observation is made as the head goes out, not when the
//! handler returns.

use std::time::Instant;

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;

use extmetrics_core::error::Result;
use extmetrics_core::labels::sanitize_code;

use super::ResponseWriter;
use crate::obs::metrics::HistogramVec;

/// Head phase of a response: captured at most once, possibly never.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadCapture {
    pub status: StatusCode,
    pub at: Instant,
}

/// Time-to-first-byte binding: the histogram plus the labels known before
/// the head. The `code` label comes from the head itself.
#[derive(Clone, Copy)]
pub struct TtfbObserver<'m> {
    pub hist: &'m HistogramVec,
    pub host: &'m str,
    pub method: &'static str,
    pub start: Instant,
}

impl TtfbObserver<'_> {
    fn observe(&self, head: HeadCapture) {
        let code = sanitize_code(head.status.as_u16());
        self.hist
            .with(&[("host", self.host), ("code", code.as_str()), ("method", self.method)])
            .observe_duration(head.at.saturating_duration_since(self.start));
    }
}

pub struct ResponseRecorder<'w, 'm> {
    inner: &'w mut dyn ResponseWriter,
    ttfb: Option<TtfbObserver<'m>>,
    head: Option<HeadCapture>,
    size: u64,
}

impl<'w, 'm> ResponseRecorder<'w, 'm> {
    pub fn new(inner: &'w mut dyn ResponseWriter) -> Self {
        Self {
            inner,
            ttfb: None,
            head: None,
            size: 0,
        }
    }

    /// Observe TTFB into `ttfb` on the first head.
    pub fn with_ttfb(mut self, ttfb: TtfbObserver<'m>) -> Self {
        self.ttfb = Some(ttfb);
        self
    }

    /// Head capture, if the handler emitted a head.
    pub fn head(&self) -> Option<HeadCapture> {
        self.head
    }

    /// Status written so far; `0` if no head was emitted.
    pub fn status(&self) -> u16 {
        self.head.map(|h| h.status.as_u16()).unwrap_or(0)
    }

    /// Body bytes accepted by the wrapped writer.
    pub fn size(&self) -> u64 {
        self.size
    }
}

#[async_trait]
impl<'w, 'm> ResponseWriter for ResponseRecorder<'w, 'm> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    async fn write_head(&mut self, status: StatusCode) -> Result<()> {
        if let Some(prev) = self.head {
            tracing::warn!(
                status = status.as_u16(),
                sent = prev.status.as_u16(),
                "superfluous write_head ignored"
            );
            return Ok(());
        }
        let head = HeadCapture {
            status,
            at: Instant::now(),
        };
        self.head = Some(head);
        if let Some(ttfb) = &self.ttfb {
            ttfb.observe(head);
        }
        self.inner.write_head(status).await
    }

    async fn write(&mut self, chunk: Bytes) -> Result<()> {
        if self.head.is_none() {
            self.write_head(StatusCode::OK).await?;
        }
        let n = chunk.len() as u64;
        self.inner.write(chunk).await?;
        self.size += n;
        Ok(())
    }
}
