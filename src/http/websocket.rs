//! WebSocket upgrade guard and handoff to the event hub.
//!
//! Browsers do not apply same-origin policy to WebSocket handshakes, so the
//! guard checks `Origin` itself before authenticating the upgrade. Only then
//! is the socket handed to the hub.

use std::net::IpAddr;

use axum::{
    extract::{ws::WebSocketUpgrade, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension,
};

use crate::http::origin::{origin_header, origin_matches};
use crate::http::response::{Guard, Rejection};
use crate::hub::{handle_socket, EventHub};
use crate::security::Authenticator;

/// Client address resolved by the guard, handed to the upgrade handler.
#[derive(Clone, Copy, Debug)]
pub struct PeerAddr(pub Option<IpAddr>);

/// Guard for `GET /ws`.
pub async fn ws_guard(State(auth): State<Authenticator>, mut req: Request, next: Next) -> Response {
    if origin_matches(&req) == Some(false) {
        tracing::warn!(
            origin = origin_header(&req).unwrap_or("<invalid>"),
            "Cross-site WebSocket upgrade rejected"
        );
        return Rejection::CrossOrigin {
            guard: Guard::WebSocket,
            with_body: false,
        }
        .into_response();
    }

    if let Err(rejection) = auth.authorize(&req, Guard::WebSocket) {
        tracing::debug!("Unauthenticated WebSocket upgrade rejected");
        return rejection.into_response();
    }

    let peer = auth.client_addr(&req);
    req.extensions_mut().insert(PeerAddr(peer));
    next.run(req).await
}

/// Complete the upgrade and register the socket with the hub.
pub async fn ws_handler(
    State(hub): State<EventHub>,
    Extension(PeerAddr(peer)): Extension<PeerAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_failed_upgrade(|error: axum::Error| tracing::warn!(%error, "WebSocket upgrade failed"))
        .on_upgrade(move |socket| handle_socket(hub, socket, peer))
}
