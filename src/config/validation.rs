//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and combinations
//! that only make sense together. Every problem is reported, not just the
//! first one.

use std::net::SocketAddr;

use crate::config::schema::AppConfig;

/// Upper bound for every `*_secs` setting (ten years). Larger values overflow
/// `Instant` arithmetic on some platforms.
pub const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.is_empty() || tls.key_path.is_empty() {
            errors.push(ValidationError::new(
                "listener.tls",
                "cert_path and key_path are both required",
            ));
        }
    }

    let auth = &config.auth;
    if auth.enabled && auth.password.is_empty() {
        errors.push(ValidationError::new(
            "auth.password",
            "must be set when authentication is enabled",
        ));
    }
    if auth.cookie_name.is_empty() || !auth.cookie_name.bytes().all(is_cookie_name_byte) {
        errors.push(ValidationError::new(
            "auth.cookie_name",
            format!("'{}' is not a valid cookie name", auth.cookie_name),
        ));
    }
    check_secs(&mut errors, "auth.token_ttl_secs", auth.token_ttl_secs);
    check_secs(&mut errors, "auth.purge_interval_secs", auth.purge_interval_secs);
    if auth.login_attempts_per_minute == 0 {
        errors.push(ValidationError::new(
            "auth.login_attempts_per_minute",
            "must be > 0",
        ));
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be > 0"));
    }
    check_secs(&mut errors, "timeouts.request_secs", config.timeouts.request_secs);
    if config.hub.send_queue == 0 {
        errors.push(ValidationError::new("hub.send_queue", "must be > 0"));
    }
    check_secs(&mut errors, "hub.ping_interval_secs", config.hub.ping_interval_secs);
    if config.hub.inbound_capacity == 0 {
        errors.push(ValidationError::new("hub.inbound_capacity", "must be > 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_secs(errors: &mut Vec<ValidationError>, field: &'static str, secs: u64) {
    if secs == 0 {
        errors.push(ValidationError::new(field, "must be > 0"));
    } else if secs > MAX_DURATION_SECS {
        errors.push(ValidationError::new(
            field,
            format!("must be at most {MAX_DURATION_SECS}"),
        ));
    }
}

// RFC 6265 token characters.
fn is_cookie_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_auth_requires_password() {
        let mut config = AppConfig::default();
        config.auth.enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "auth.password");
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.auth.cookie_name = "bad cookie".into();
        config.hub.send_queue = 0;
        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["listener.bind_address", "auth.cookie_name", "hub.send_queue"]
        );
    }

    #[test]
    fn test_durations_are_bounded() {
        let mut config = AppConfig::default();
        config.auth.token_ttl_secs = u64::MAX / 2;
        config.hub.ping_interval_secs = MAX_DURATION_SECS + 1;
        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["auth.token_ttl_secs", "hub.ping_interval_secs"]);

        config.auth.token_ttl_secs = MAX_DURATION_SECS;
        config.hub.ping_interval_secs = 30;
        assert!(validate_config(&config).is_ok());
    }
}
