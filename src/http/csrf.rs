//! Origin-based CSRF guard for state-changing requests.
//!
//! GET, HEAD and OPTIONS never reach the check. Everything else must show
//! evidence of coming from the same host: the `Origin` header when present,
//! otherwise the host part of `Referer`. A request carrying neither header is
//! let through; API clients outside a browser send neither.

use axum::{
    extract::Request,
    http::{header, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::origin::{is_same_origin, referer_host, resolve_host};
use crate::http::response::{Guard, Rejection};

/// Methods that do not change server state.
pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// CSRF middleware.
pub async fn csrf_guard(req: Request, next: Next) -> Response {
    if is_safe_method(req.method()) {
        return next.run(req).await;
    }

    match check(&req) {
        Ok(()) => next.run(req).await,
        Err(rejection) => {
            tracing::warn!(
                method = %req.method(),
                path = %req.uri().path(),
                host = %resolve_host(&req),
                "Cross-site request blocked"
            );
            rejection.into_response()
        }
    }
}

fn check(req: &Request) -> Result<(), Rejection> {
    let host = resolve_host(req);
    let blocked = Rejection::CrossOrigin {
        guard: Guard::Csrf,
        with_body: true,
    };

    // An empty header counts as absent.
    if let Some(origin) = req.headers().get(header::ORIGIN).filter(|v| !v.is_empty()) {
        return match origin.to_str() {
            Ok(origin) if is_same_origin(origin, &host) => Ok(()),
            _ => Err(blocked),
        };
    }

    if let Some(referer) = req.headers().get(header::REFERER).filter(|v| !v.is_empty()) {
        return match referer.to_str() {
            Ok(referer) if !host.is_empty() && referer_host(referer) == host => Ok(()),
            _ => Err(blocked),
        };
    }

    tracing::debug!(
        method = %req.method(),
        path = %req.uri().path(),
        "State-changing request without Origin or Referer"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware, routing::post, Router};
    use tower::ServiceExt;

    fn test_app() -> Router {
        Router::new()
            .route(
                "/api/connection/save",
                post(|| async { "saved" }).get(|| async { "list" }).delete(|| async { "gone" }),
            )
            .layer(middleware::from_fn(csrf_guard))
    }

    fn request(method: &str, headers: &[(&str, &str)]) -> Request {
        let mut builder = Request::builder()
            .method(method)
            .uri("/api/connection/save")
            .header("host", "localhost:8088");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_safe_methods() {
        assert!(is_safe_method(&Method::GET));
        assert!(is_safe_method(&Method::HEAD));
        assert!(is_safe_method(&Method::OPTIONS));
        assert!(!is_safe_method(&Method::POST));
        assert!(!is_safe_method(&Method::PUT));
        assert!(!is_safe_method(&Method::PATCH));
        assert!(!is_safe_method(&Method::DELETE));
    }

    #[tokio::test]
    async fn test_foreign_origin_blocked_with_json() {
        let response = test_app()
            .oneshot(request("POST", &[("origin", "http://evil.test")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({"success": false, "msg": "cross-origin request blocked"})
        );
    }

    #[tokio::test]
    async fn test_same_origin_passes() {
        for origin in ["http://localhost:8088", "https://localhost:8088/"] {
            let response = test_app()
                .oneshot(request("DELETE", &[("origin", origin)]))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "origin {origin}");
        }
    }

    #[tokio::test]
    async fn test_safe_method_skips_check() {
        let response = test_app()
            .oneshot(request(
                "GET",
                &[("origin", "http://evil.test"), ("referer", "http://evil.test/x")],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_referer_fallback() {
        let response = test_app()
            .oneshot(request("POST", &[("referer", "http://localhost:8088/browser")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = test_app()
            .oneshot(request("POST", &[("referer", "http://evil.test/localhost:8088")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["msg"], "cross-origin request blocked");
    }

    #[tokio::test]
    async fn test_origin_takes_precedence_over_referer() {
        let response = test_app()
            .oneshot(request(
                "POST",
                &[("origin", "http://evil.test"), ("referer", "http://localhost:8088/")],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_forwarded_host_is_the_reference() {
        let response = test_app()
            .oneshot(request(
                "POST",
                &[("x-forwarded-host", "rdm.example.com"), ("origin", "https://rdm.example.com")],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_empty_headers_count_as_absent() {
        let response = test_app()
            .oneshot(request("POST", &[("origin", ""), ("referer", "http://localhost:8088/")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = test_app()
            .oneshot(request("POST", &[("origin", ""), ("referer", "")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = test_app()
            .oneshot(request("POST", &[("origin", ""), ("referer", "http://evil.test/")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_no_evidence_passes() {
        let response = test_app().oneshot(request("POST", &[])).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
