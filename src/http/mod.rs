//! HTTP edge.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → request.rs (request id, tracing span)
//!     → body limit, security headers
//!     → cors.rs (same-origin check, preflight)
//!     → csrf.rs (Origin/Referer check on unsafe methods)
//!     → public routes | auth guard → protected routes | websocket.rs → hub
//!     → response.rs (JSON envelope, rejections)
//! ```
//!
//! origin.rs holds the host/origin helpers every guard shares.

pub mod cors;
pub mod csrf;
pub mod origin;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use request::X_REQUEST_ID;
pub use response::{ApiResponse, Rejection};
pub use server::{AppState, HttpServer};
