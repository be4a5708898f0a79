//! Streaming bridge between axum and handler chains.
//!
//! Each request's chain runs on its own task with a [`ChannelWriter`]. The
//! head goes out through a oneshot the moment it is written; body chunks
//! follow through an mpsc channel that backs the response body. If the chain
//! finishes without a head, the outcome decides the response:
//! success -> `200` with no body, status error -> that status, anything
//! else -> `500`. A chain that fails or panics after the head went out ends
//! the body with an error, so the client sees a broken response rather than
//! a short one.

use std::io;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, response, HeaderMap, HeaderValue, Response, StatusCode};
use axum::response::IntoResponse;
use bytes::Bytes;
use futures_util::FutureExt;
use serde_json::json;
use tokio::sync::{mpsc, oneshot};

use extmetrics_core::error::{ExtMetricsError, Result};

use crate::app_state::AppState;
use crate::pipeline::{Handler, Next, ResponseWriter};

/// Body chunks buffered between the chain task and hyper.
const BODY_CHANNEL_CAPACITY: usize = 16;

pub type BodyItem = std::result::Result<Bytes, io::Error>;

fn client_gone() -> ExtMetricsError {
    ExtMetricsError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "client gone"))
}

/// Writer feeding an axum response under construction.
pub struct ChannelWriter {
    headers: HeaderMap,
    head_tx: Option<oneshot::Sender<response::Parts>>,
    body_tx: mpsc::Sender<BodyItem>,
}

impl ChannelWriter {
    pub fn new(head_tx: oneshot::Sender<response::Parts>, body_tx: mpsc::Sender<BodyItem>) -> Self {
        Self {
            headers: HeaderMap::new(),
            head_tx: Some(head_tx),
            body_tx,
        }
    }

    pub fn head_sent(&self) -> bool {
        self.head_tx.is_none()
    }

    /// Terminate a response whose head is already out.
    async fn fail(&self, e: &ExtMetricsError) {
        let err = io::Error::new(io::ErrorKind::Other, e.to_string());
        let _ = self.body_tx.send(Err(err)).await;
    }
}

#[async_trait]
impl ResponseWriter for ChannelWriter {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    async fn write_head(&mut self, status: StatusCode) -> Result<()> {
        let Some(tx) = self.head_tx.take() else {
            return Ok(());
        };
        let mut res = Response::new(());
        *res.status_mut() = status;
        *res.headers_mut() = std::mem::take(&mut self.headers);
        let (parts, ()) = res.into_parts();
        tx.send(parts).map_err(|_| client_gone())
    }

    async fn write(&mut self, chunk: Bytes) -> Result<()> {
        if self.head_tx.is_some() {
            self.write_head(StatusCode::OK).await?;
        }
        self.body_tx.send(Ok(chunk)).await.map_err(|_| client_gone())
    }
}

/// Response for a chain that failed before writing a head.
pub fn error_response(e: &ExtMetricsError) -> Response<Body> {
    let (status, message) = match e.status_code().and_then(|c| StatusCode::from_u16(c).ok()) {
        Some(status) => (status, e.to_string()),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string()),
    };
    let body = json!({
        "error": {
            "status": status.as_u16(),
            "message": message,
        }
    });
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body.to_string(),
    )
        .into_response()
}

/// Fallback handler: run the matching route's chain.
pub async fn serve_chain(State(app): State<AppState>, req: Request) -> Response<Body> {
    let chain = app.route(req.uri().path());
    match chain {
        Some(chain) => run_chain(chain, req).await,
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

/// Run `chain` on its own task and stream whatever it writes.
pub async fn run_chain(chain: Arc<[Arc<dyn Handler>]>, req: Request) -> Response<Body> {
    let (head_tx, head_rx) = oneshot::channel();
    let (body_tx, body_rx) = mpsc::channel::<BodyItem>(BODY_CHANNEL_CAPACITY);

    let task = tokio::spawn(async move {
        let mut req = req;
        let mut w = ChannelWriter::new(head_tx, body_tx);
        let res = AssertUnwindSafe(Next::new(&chain).run(&mut w, &mut req))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                tracing::error!("handler chain panicked");
                Err(ExtMetricsError::Internal("handler panicked".into()))
            });
        if let Err(e) = &res {
            if w.head_sent() {
                tracing::warn!(error = %e, "handler failed after head; aborting body");
                w.fail(e).await;
            }
        }
        res
    });

    match head_rx.await {
        Ok(parts) => {
            let stream = futures_util::stream::unfold(body_rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            });
            Response::from_parts(parts, Body::from_stream(stream))
        }
        // Writer dropped without a head: the chain is done.
        Err(_) => match task.await {
            Ok(Ok(())) => StatusCode::OK.into_response(),
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "handler chain failed");
                error_response(&e)
            }
            Err(join) => {
                tracing::error!(error = %join, "handler chain task failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
    }
}
