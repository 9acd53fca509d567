//! Login, logout and session status.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::http::response::{ApiResponse, Guard, Rejection};
use crate::observability::metrics;
use crate::security::auth::{Authenticator, ClientAddr};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub enabled: bool,
    pub authenticated: bool,
}

pub async fn login(
    State(auth): State<Authenticator>,
    ClientAddr(client): ClientAddr,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    if !auth.is_enabled() {
        return ApiResponse::ok(SessionStatus {
            enabled: false,
            authenticated: true,
        })
        .into_response();
    }

    let Some(client) = client else {
        tracing::warn!("Login without a resolvable client address");
        return Rejection::Unauthenticated { guard: Guard::Login }.into_response();
    };

    if !auth.allow_login_attempt(client) {
        tracing::warn!(client = %client, "Login attempts exhausted");
        metrics::record_login("rate_limited");
        return Rejection::TooManyRequests.into_response();
    }

    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Malformed login request");
            return (StatusCode::BAD_REQUEST, ApiResponse::failure("invalid request")).into_response();
        }
    };

    if !auth.check_credentials(&request.username, &request.password) {
        tracing::warn!(client = %client, username = %request.username, "Login failed");
        metrics::record_login("failure");
        return (
            StatusCode::UNAUTHORIZED,
            ApiResponse::failure("invalid username or password"),
        )
            .into_response();
    }

    let token = auth.tokens().issue(client);
    metrics::record_login("success");
    tracing::info!(client = %client, "Login succeeded");

    (
        jar.add(auth.session_cookie(token)),
        ApiResponse::ok(SessionStatus {
            enabled: true,
            authenticated: true,
        }),
    )
        .into_response()
}

pub async fn logout(State(auth): State<Authenticator>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(auth.cookie_name()) {
        if auth.tokens().revoke(cookie.value()) {
            tracing::info!("Session revoked");
        }
    }
    (jar.add(auth.removal_cookie()), ApiResponse::success()).into_response()
}

pub async fn status(
    State(auth): State<Authenticator>,
    ClientAddr(client): ClientAddr,
    headers: HeaderMap,
) -> ApiResponse {
    ApiResponse::ok(SessionStatus {
        enabled: auth.is_enabled(),
        authenticated: auth.verify(&headers, client),
    })
}
