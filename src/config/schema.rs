//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the web edge.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Default request body ceiling: 10 MiB.
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 << 20;

/// Default name of the authentication cookie.
pub const DEFAULT_COOKIE_NAME: &str = "rdm_token";

/// Root configuration for the web edge.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Authentication and token settings.
    pub auth: AuthConfig,

    /// Security hardening (headers, body limit).
    pub security: SecurityConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// WebSocket event hub settings.
    pub hub: HubConfig,

    /// Static asset serving.
    pub assets: AssetsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8088").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8088".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Require a login before the protected API and `/ws` can be used.
    pub enabled: bool,

    /// Login user name.
    pub username: String,

    /// Login password.
    pub password: String,

    /// Cookie carrying the session token.
    pub cookie_name: String,

    /// Token lifetime in seconds.
    pub token_ttl_secs: u64,

    /// Interval between sweeps of expired tokens, in seconds.
    pub purge_interval_secs: u64,

    /// Take the client address from `X-Forwarded-For` / `X-Real-IP`.
    /// Only safe behind a reverse proxy that overwrites these headers.
    pub trust_forwarded_for: bool,

    /// Login attempts allowed per client address per minute.
    pub login_attempts_per_minute: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            username: "admin".to_string(),
            password: String::new(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            token_ttl_secs: 24 * 60 * 60,
            purge_interval_secs: 300,
            trust_forwarded_for: false,
            login_attempts_per_minute: 10,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security response headers.
    pub enable_headers: bool,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Event hub configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HubConfig {
    /// Outbound frames queued per connection before it counts as failed.
    pub send_queue: usize,

    /// Keepalive ping interval in seconds.
    pub ping_interval_secs: u64,

    /// Capacity of the channel carrying client-originated events.
    pub inbound_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            send_queue: 256,
            ping_interval_secs: 30,
            inbound_capacity: 64,
        }
    }
}

/// Static asset configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AssetsConfig {
    /// Directory holding the built UI; unknown paths fall back to its `index.html`.
    pub dir: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
