//! Request body size ceiling.
//!
//! A declared `Content-Length` above the ceiling is answered with 413 before
//! any of the body is read. Bodies without a length are wrapped so the read
//! fails as soon as it crosses the ceiling. axum's extractor-level limit is
//! raised to the same value so both agree.

use axum::extract::DefaultBodyLimit;
use tower::layer::util::{Identity, Stack};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;

pub type BodyLimitLayer =
    ServiceBuilder<Stack<DefaultBodyLimit, Stack<RequestBodyLimitLayer, Identity>>>;

pub fn body_limit(max_bytes: usize) -> BodyLimitLayer {
    ServiceBuilder::new()
        .layer(RequestBodyLimitLayer::new(max_bytes))
        .layer(DefaultBodyLimit::max(max_bytes))
}
