//! Per-connection socket driver.
//!
//! One writer task drains the member's queue into the socket (so writes to a
//! socket are serialized and keep emit order) and sends keepalive pings. One
//! reader task consumes client frames. When either ends, the member is
//! deregistered and the socket dropped.

use std::net::IpAddr;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};

use crate::hub::registry::{ClientEvent, EventHub};

/// Register `socket` with the hub and drive it until it closes.
pub async fn handle_socket(hub: EventHub, socket: WebSocket, peer: Option<IpAddr>) {
    let (id, mut rx) = hub.register(peer);
    tracing::info!(connection_id = %id, peer = ?peer, "WebSocket client connected");

    let (mut ws_tx, mut ws_rx) = socket.split();

    let ping_interval = hub.ping_interval();
    let mut writer = tokio::spawn(async move {
        let mut ping = tokio::time::interval(ping_interval);
        ping.tick().await; // consume first immediate tick

        loop {
            tokio::select! {
                frame = rx.recv() => match frame {
                    Some(text) => {
                        if ws_tx.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    // Deregistered: the hub dropped our sender.
                    None => break,
                },
                _ = ping.tick() => {
                    if ws_tx.send(Message::Ping(Default::default())).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = ws_tx.send(Message::Close(None)).await;
    });

    let reader_hub = hub.clone();
    let mut reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientEvent>(text.as_str()) {
                    Ok(event) => reader_hub.publish_inbound(event),
                    Err(e) => {
                        tracing::debug!(connection_id = %id, error = %e, "Ignoring malformed client frame");
                    }
                },
                Message::Close(_) => break,
                // Pings are answered by axum; pongs and binary frames are ignored.
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    hub.unregister(&id);
    tracing::info!(connection_id = %id, "WebSocket client disconnected");
}
