//! Same-origin-only CORS guard.
//!
//! Unlike a permissive CORS layer this never negotiates: the UI and the API
//! are always served from the same host, so a foreign `Origin` is rejected
//! with 403. Safe methods get a bare status; state-changing methods get the
//! same JSON body the CSRF guard produces. Same-origin callers get the allow
//! headers echoed back.

use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::csrf::is_safe_method;
use crate::http::origin::{origin_header, origin_matches};
use crate::http::response::{Guard, Rejection};

pub const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, X-Requested-With";

/// CORS middleware. Pre-flight `OPTIONS` requests always end here with 204.
pub async fn cors_guard(req: Request, next: Next) -> Response {
    let allow_origin = match origin_matches(&req) {
        Some(false) => {
            tracing::warn!(
                origin = origin_header(&req).unwrap_or("<invalid>"),
                path = %req.uri().path(),
                "Cross-origin request rejected"
            );
            return Rejection::CrossOrigin {
                guard: Guard::Cors,
                with_body: !is_safe_method(req.method()),
            }
            .into_response();
        }
        Some(true) => req.headers().get(header::ORIGIN).cloned(),
        None => None,
    };

    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };

    if let Some(origin) = allow_origin {
        apply_allow_headers(response.headers_mut(), origin);
    }
    response
}

fn apply_allow_headers(headers: &mut HeaderMap, origin: HeaderValue) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
}
