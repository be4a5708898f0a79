//! Request instrumentor (`extend_metrics`).
//!
//! Per request: START (labels, in-flight +1) -> IN_FLIGHT (delegate through a
//! [`ResponseRecorder`]) -> optional head capture, with TTFB observed as the
//! head goes out -> FINALIZED. The in-flight
//! gauge is released by a guard, so it returns to baseline on success,
//! error, panic unwind, and cancellation alike.
//!
//! Downstream errors are observed and returned unchanged. Errors carrying an
//! HTTP status get the full observation set; errors without one only bump
//! the error counter.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;

use extmetrics_core::directive::Directive;
use extmetrics_core::error::Result;
use extmetrics_core::labels::{sanitize_code, sanitize_method};

use super::recorder::{HeadCapture, ResponseRecorder, TtfbObserver};
use super::size::{estimate_request_size, request_host};
use super::{Handler, Next, ResponseWriter};
use crate::obs::metrics::Gauge;
use crate::obs::HttpMetrics;

pub const DIRECTIVE: &str = "extend_metrics";

pub struct Instrumentor {
    metrics: Arc<HttpMetrics>,
}

impl Instrumentor {
    pub fn new(metrics: Arc<HttpMetrics>) -> Self {
        Self { metrics }
    }

    /// `extend_metrics` takes no arguments.
    pub fn from_directive(d: &Directive, metrics: Arc<HttpMetrics>) -> Result<Self> {
        d.expect_no_args()?;
        Ok(Self::new(metrics))
    }
}

/// Holds one in-flight slot; released on drop.
struct InFlightGuard(Gauge);

impl InFlightGuard {
    fn acquire(g: Gauge) -> Self {
        g.inc();
        Self(g)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.dec();
    }
}

/// Status label slots: the head phase may fill it, finalization fills it
/// only if the head phase did not.
#[derive(Debug, Clone, Copy, Default)]
struct StatusSlots {
    head: Option<u16>,
}

impl StatusSlots {
    fn from_head(head: Option<HeadCapture>) -> Self {
        Self {
            head: head.map(|h| h.status.as_u16()),
        }
    }

    fn resolve(self, final_status: u16) -> String {
        sanitize_code(self.head.unwrap_or(final_status))
    }
}

/// Measurement window for one request.
struct Measurement<'m> {
    metrics: &'m HttpMetrics,
    host: String,
    method: &'static str,
    start: Instant,
    _in_flight: InFlightGuard,
}

impl<'m> Measurement<'m> {
    fn open(metrics: &'m HttpMetrics, req: &Request<Body>) -> Self {
        let host = request_host(req).to_string();
        let method = sanitize_method(req.method().as_str());
        let in_flight =
            InFlightGuard::acquire(metrics.requests_in_flight.with(&[("host", host.as_str())]));
        Self {
            metrics,
            host,
            method,
            start: Instant::now(),
            _in_flight: in_flight,
        }
    }

    fn count_request(&self) {
        self.metrics.requests_total.with(&[("host", self.host.as_str())]).inc();
    }

    fn count_error(&self) {
        self.metrics.request_errors.with(&[("host", self.host.as_str())]).inc();
    }

    fn ttfb(&self) -> TtfbObserver<'_> {
        TtfbObserver {
            hist: &self.metrics.response_duration,
            host: self.host.as_str(),
            method: self.method,
            start: self.start,
        }
    }

    fn finalize(
        &self,
        slots: StatusSlots,
        status: u16,
        duration: Duration,
        req: &Request<Body>,
        response_size: u64,
    ) {
        let code = slots.resolve(status);
        let labels = [
            ("host", self.host.as_str()),
            ("code", code.as_str()),
            ("method", self.method),
        ];

        self.metrics.request_duration.with(&labels).observe_duration(duration);
        self.metrics
            .request_size
            .with(&labels)
            .observe(estimate_request_size(req) as f64);
        self.metrics.response_size.with(&labels).observe(response_size as f64);

        tracing::debug!(
            host = %self.host,
            method = self.method,
            code = %code,
            duration_ms = duration.as_millis() as u64,
            response_size,
            "request observed"
        );
    }
}

#[async_trait]
impl Handler for Instrumentor {
    fn name(&self) -> &'static str {
        DIRECTIVE
    }

    async fn serve(
        &self,
        w: &mut dyn ResponseWriter,
        req: &mut Request<Body>,
        next: Next<'_>,
    ) -> Result<()> {
        let m = Measurement::open(&self.metrics, req);
        let mut rec = ResponseRecorder::new(w).with_ttfb(m.ttfb());

        let result = next.run(&mut rec, req).await;
        let duration = m.start.elapsed();
        m.count_request();

        let slots = StatusSlots::from_head(rec.head());

        match result {
            Ok(()) => {
                m.finalize(slots, rec.status(), duration, req, rec.size());
                Ok(())
            }
            Err(e) => {
                match e.status_code() {
                    Some(status) => m.finalize(slots, status, duration, req, rec.size()),
                    None => tracing::debug!(
                        host = %m.host,
                        error = %e,
                        "handler error without status; duration and sizes not observed"
                    ),
                }
                m.count_error();
                Err(e)
            }
        }
    }
}
