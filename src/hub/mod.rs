//! WebSocket event hub.
//!
//! # Data Flow
//! ```text
//! business service ──emit(event, payload)──▶ registry.rs
//!                                               │ snapshot members
//!                                               ▼
//!                              per-member bounded queue (mpsc)
//!                                               │
//!                                               ▼
//!                          socket.rs writer task ──▶ WebSocket ──▶ browser
//!
//! browser ──▶ WebSocket ──▶ socket.rs reader task ──▶ subscribe() receivers
//! ```
//!
//! # Design Decisions
//! - The hub exclusively owns membership; sockets only hold their receiver
//! - A failed or full queue removes the member instead of blocking emit
//! - Frames are encoded once per emit and shared between members

pub mod registry;
pub mod socket;

pub use registry::{ClientEvent, ConnectionId, EventHub, HubError};
pub use socket::handle_socket;
