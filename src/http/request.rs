//! Request identification and tracing spans.
//!
//! Every request gets an `x-request-id` (UUID v4) unless the client already
//! sent one; the id is echoed on the response and recorded on the request
//! span so every log line of a request can be correlated.

use axum::{body::Body, http::Request};
use tracing::Span;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Span for one HTTP request, carrying its request id.
pub fn make_request_span(req: &Request<Body>) -> Span {
    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
    )
}
