//! Per-request bookkeeping: a request id, the signed-in viewer once a
//! handler has resolved it, and one log line per finished request.

use std::sync::{Arc, OnceLock};

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tokio::time::Instant;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

#[derive(Clone, Debug)]
pub struct RequestContext {
    pub request_id: String,
    viewer_id: Arc<OnceLock<i64>>,
}

impl RequestContext {
    fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().simple().to_string(),
            viewer_id: Arc::new(OnceLock::new()),
        }
    }

    /// Remember who made the request; the first recorded id wins.
    pub fn record_viewer(&self, user_id: i64) {
        let _ = self.viewer_id.set(user_id);
    }

    pub fn viewer_id(&self) -> Option<i64> {
        self.viewer_id.get().copied()
    }
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext::new();
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();
    let ctx = request.extensions().get::<RequestContext>().cloned();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis();
    let request_id = ctx.as_ref().map(|ctx| ctx.request_id.as_str()).unwrap_or("");
    let viewer_id = ctx.as_ref().and_then(RequestContext::viewer_id);

    if !(status.is_client_error() || status.is_server_error()) {
        debug!(
            target = "yatube::http::response",
            status = status.as_u16(),
            method = %method,
            path = %path,
            elapsed_ms,
            request_id,
            viewer_id,
            "request served"
        );
        return response;
    }

    let (source, messages) = match response.extensions_mut().remove::<ErrorReport>() {
        Some(report) => (report.source, report.messages),
        None => ("unknown", Vec::new()),
    };
    let detail = messages.first().map(String::as_str).unwrap_or("none");

    if status.is_server_error() {
        error!(
            target = "yatube::http::response",
            status = status.as_u16(),
            method = %method,
            path = %path,
            elapsed_ms,
            request_id,
            viewer_id,
            source,
            detail,
            chain = ?messages,
            "request failed"
        );
    } else {
        warn!(
            target = "yatube::http::response",
            status = status.as_u16(),
            method = %method,
            path = %path,
            elapsed_ms,
            request_id,
            viewer_id,
            source,
            detail,
            "request rejected"
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewer_is_recorded_once_and_shared_between_clones() {
        let ctx = RequestContext::new();
        let seen_by_handler = ctx.clone();
        assert_eq!(ctx.viewer_id(), None);

        seen_by_handler.record_viewer(7);
        seen_by_handler.record_viewer(9);

        assert_eq!(ctx.viewer_id(), Some(7));
        assert_eq!(ctx.request_id.len(), 32);
    }
}
