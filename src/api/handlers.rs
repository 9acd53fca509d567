//! Version and system handlers.

use axum::extract::State;
use serde::Serialize;

use crate::http::response::ApiResponse;
use crate::http::server::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub version: &'static str,
    pub auth_enabled: bool,
    pub ws_clients: usize,
    pub active_tokens: usize,
}

pub async fn get_version() -> ApiResponse {
    ApiResponse::ok(VersionInfo {
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn get_system_info(State(state): State<AppState>) -> ApiResponse {
    ApiResponse::ok(SystemInfo {
        version: env!("CARGO_PKG_VERSION"),
        auth_enabled: state.auth.is_enabled(),
        ws_clients: state.hub.connection_count(),
        active_tokens: state.auth.tokens().len(),
    })
}
