//! Hub membership and broadcast.

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::Utf8Bytes;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::config::HubConfig;
use crate::observability::metrics;

/// Unique identifier of a hub member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ws_{}", self.0.simple())
    }
}

/// Error returned by [`EventHub::emit`].
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("failed to encode event '{event}': {source}")]
    Encode {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Wire frame for server-originated events.
#[derive(Serialize)]
struct Envelope<'a, T: ?Sized> {
    event: &'a str,
    data: &'a T,
}

/// An event sent by a browser client over its socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEvent {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// A registered connection, as seen from the hub side.
struct Member {
    tx: mpsc::Sender<Utf8Bytes>,
    peer: Option<IpAddr>,
    connected_at: Instant,
}

struct Inner {
    members: DashMap<ConnectionId, Member>,
    send_queue: usize,
    ping_interval: Duration,
    inbound: broadcast::Sender<ClientEvent>,
}

/// Registry of live WebSocket connections plus the broadcast over them.
///
/// Cheap to clone; every clone refers to the same membership set.
#[derive(Clone)]
pub struct EventHub {
    inner: Arc<Inner>,
}

impl EventHub {
    pub fn new(config: &HubConfig) -> Self {
        let (inbound, _) = broadcast::channel(config.inbound_capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                members: DashMap::new(),
                send_queue: config.send_queue.max(1),
                ping_interval: Duration::from_secs(config.ping_interval_secs.max(1)),
                inbound,
            }),
        }
    }

    /// Add a member. The returned receiver yields every frame queued for it,
    /// in emit order. Dropping the receiver makes the next write fail.
    pub fn register(&self, peer: Option<IpAddr>) -> (ConnectionId, mpsc::Receiver<Utf8Bytes>) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(self.inner.send_queue);
        self.inner.members.insert(
            id,
            Member {
                tx,
                peer,
                connected_at: Instant::now(),
            },
        );
        metrics::record_ws_connections(self.inner.members.len());
        (id, rx)
    }

    /// Remove a member. Its queue closes once pending frames are drained.
    /// Returns whether it was still registered.
    pub fn unregister(&self, id: &ConnectionId) -> bool {
        match self.inner.members.remove(id) {
            Some((_, member)) => {
                metrics::record_ws_connections(self.inner.members.len());
                tracing::debug!(
                    connection_id = %id,
                    peer = ?member.peer,
                    connected_secs = member.connected_at.elapsed().as_secs(),
                    "Connection deregistered"
                );
                true
            }
            None => false,
        }
    }

    pub fn is_registered(&self, id: &ConnectionId) -> bool {
        self.inner.members.contains_key(id)
    }

    pub fn connection_count(&self) -> usize {
        self.inner.members.len()
    }

    /// Broadcast `payload` under `event` to every current member.
    ///
    /// The frame `{"event": ..., "data": ...}` is encoded once. Membership is
    /// snapshotted before any write, so concurrent registration or removal
    /// never interferes with the iteration. A member whose queue is closed or
    /// full is removed and skipped; the rest still receive the frame.
    /// Returns the number of members the frame was queued to.
    pub fn emit<T>(&self, event: &str, payload: &T) -> Result<usize, HubError>
    where
        T: Serialize + ?Sized,
    {
        let frame = serde_json::to_string(&Envelope {
            event,
            data: payload,
        })
        .map_err(|source| HubError::Encode {
            event: event.to_string(),
            source,
        })?;
        let frame = Utf8Bytes::from(frame);

        let snapshot: Vec<(ConnectionId, mpsc::Sender<Utf8Bytes>)> = self
            .inner
            .members
            .iter()
            .map(|entry| (*entry.key(), entry.value().tx.clone()))
            .collect();

        let mut delivered = 0;
        for (id, tx) in snapshot {
            match tx.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    let reason = match err {
                        mpsc::error::TrySendError::Full(_) => "queue_full",
                        mpsc::error::TrySendError::Closed(_) => "closed",
                    };
                    tracing::warn!(connection_id = %id, event, reason, "Dropping hub member after failed write");
                    metrics::record_member_dropped(reason);
                    self.unregister(&id);
                }
            }
        }

        metrics::record_event_emitted();
        tracing::trace!(event, delivered, "Event emitted");
        Ok(delivered)
    }

    /// Receive events sent by browser clients.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.inbound.subscribe()
    }

    /// Remove every member; their sockets close once their writers notice.
    pub fn close_all(&self) -> usize {
        let count = self.inner.members.len();
        self.inner.members.clear();
        metrics::record_ws_connections(0);
        count
    }

    pub(crate) fn ping_interval(&self) -> Duration {
        self.inner.ping_interval
    }

    pub(crate) fn publish_inbound(&self, event: ClientEvent) {
        // No subscribers is not an error.
        let _ = self.inner.inbound.send(event);
    }
}
