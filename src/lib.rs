//! Web edge for the RDM database browser.
//!
//! Serves the management UI and API over HTTP behind an ordered guard chain
//! and pushes server events to browsers over a single `/ws` endpoint.

// Core subsystems
pub mod api;
pub mod config;
pub mod http;
pub mod hub;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::AppConfig;
pub use http::{AppState, HttpServer};
pub use hub::EventHub;
pub use lifecycle::Shutdown;
pub use security::{Authenticator, TokenStore};
