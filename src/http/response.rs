//! Response envelope and guard rejections.
//!
//! Every JSON body the edge produces uses the `{success, msg, data}` envelope
//! the UI expects. Guard rejections map onto a small taxonomy so the status
//! code and body shape stay consistent across CORS, CSRF, auth and `/ws`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::observability::metrics;

/// Message returned when a state-changing request fails the origin check.
pub const CROSS_ORIGIN_MSG: &str = "cross-origin request blocked";

/// JSON envelope shared by all API responses.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ApiResponse {
    pub success: bool,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApiResponse {
    pub fn ok(data: impl Serialize) -> Self {
        Self {
            success: true,
            msg: String::new(),
            data: serde_json::to_value(data).ok(),
        }
    }

    pub fn success() -> Self {
        Self {
            success: true,
            msg: String::new(),
            data: None,
        }
    }

    pub fn failure(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            msg: msg.into(),
            data: None,
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Which guard produced a rejection. Used for logs and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Cors,
    Csrf,
    Auth,
    WebSocket,
    Login,
}

impl Guard {
    pub fn as_str(self) -> &'static str {
        match self {
            Guard::Cors => "cors",
            Guard::Csrf => "csrf",
            Guard::Auth => "auth",
            Guard::WebSocket => "websocket",
            Guard::Login => "login",
        }
    }
}

/// A request stopped at the edge.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// Origin/host mismatch. `with_body` selects the JSON envelope (CSRF)
    /// over a bare status (CORS, WebSocket).
    #[error("cross-origin request rejected by {} guard", .guard.as_str())]
    CrossOrigin { guard: Guard, with_body: bool },

    /// Missing, unknown, expired or mis-bound token.
    #[error("unauthenticated request rejected by {} guard", .guard.as_str())]
    Unauthenticated { guard: Guard },

    /// Login attempts exhausted for this client.
    #[error("too many requests")]
    TooManyRequests,
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::CrossOrigin { .. } => StatusCode::FORBIDDEN,
            Rejection::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Rejection::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    fn guard(&self) -> Guard {
        match self {
            Rejection::CrossOrigin { guard, .. } | Rejection::Unauthenticated { guard } => *guard,
            Rejection::TooManyRequests => Guard::Login,
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            Rejection::CrossOrigin { .. } => "cross_origin",
            Rejection::Unauthenticated { .. } => "unauthenticated",
            Rejection::TooManyRequests => "rate_limited",
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        metrics::record_guard_rejection(self.guard().as_str(), self.reason());
        match self {
            Rejection::CrossOrigin {
                with_body: true, ..
            } => (
                StatusCode::FORBIDDEN,
                ApiResponse::failure(CROSS_ORIGIN_MSG),
            )
                .into_response(),
            Rejection::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                ApiResponse::failure("too many login attempts"),
            )
                .into_response(),
            other => other.status().into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_failure_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::failure(CROSS_ORIGIN_MSG)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"success": false, "msg": "cross-origin request blocked"})
        );
    }

    #[test]
    fn test_ok_envelope_carries_data() {
        let body = serde_json::to_value(ApiResponse::ok(serde_json::json!({"version": "1"}))).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["version"], "1");
    }

    #[tokio::test]
    async fn test_bare_rejections_have_no_body() {
        let response = Rejection::CrossOrigin {
            guard: Guard::Cors,
            with_body: false,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());

        let response = Rejection::Unauthenticated { guard: Guard::Auth }.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
