//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → limits.rs (body size ceiling)
//!     → headers.rs (security response headers)
//!     → [http::cors, http::csrf origin guards]
//!     → auth.rs (token cookie, protected group and /ws only)
//!
//! Login:
//!     → rate_limit.rs (per-client attempt budget)
//!     → auth.rs (credential check)
//!     → tokens.rs (issue token bound to client address)
//! ```
//!
//! # Design Decisions
//! - Fail closed: a token with no resolvable client address never validates
//! - Token state lives in an explicit store object, never a global
//! - No trust in client-supplied forwarding headers unless configured

pub mod auth;
pub mod headers;
pub mod limits;
pub mod rate_limit;
pub mod tokens;

pub use auth::{auth_middleware, Authenticator};
pub use tokens::TokenStore;
