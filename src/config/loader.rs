//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "0.0.0.0:9000"

            [security]
            max_body_size = 1024
            "#,
        )
        .unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:9000");
        assert_eq!(config.security.max_body_size, 1024);
    }

    #[test]
    fn test_parse_rejects_bad_toml() {
        assert!(matches!(
            parse_config("[listener"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validation_message_lists_fields() {
        let err = parse_config("[timeouts]\nrequest_secs = 0\n[hub]\nsend_queue = 0\n")
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("timeouts.request_secs"));
        assert!(msg.contains("hub.send_queue"));
    }

    #[test]
    fn test_sample_config_is_valid() {
        let config = parse_config(include_str!("../../rdm-web.example.toml")).unwrap();
        assert!(config.auth.enabled);
        assert_eq!(config.auth.cookie_name, "rdm_token");
        assert_eq!(config.security.max_body_size, 10 << 20);
    }

    #[test]
    fn test_huge_token_ttl_is_rejected() {
        let err = parse_config(
            "[auth]\nenabled = true\npassword = \"pw\"\ntoken_ttl_secs = 9223372036854775807\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("auth.token_ttl_secs"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/rdm-web.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
