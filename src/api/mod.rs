//! Built-in API routes.
//!
//! Public routes are reachable without a session. Protected routes are
//! merged with the business routes supplied to the server and sit behind the
//! auth guard.

pub mod auth;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};

use crate::http::server::AppState;

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/version", get(handlers::get_version))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/status", get(auth::status))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/api/system/info", get(handlers::get_system_info))
}
