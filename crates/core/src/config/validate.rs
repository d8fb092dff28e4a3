use super::{types::Config, AuthMethod, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Auth section exists (enforced by serde)
/// - Server port is not 0
/// - Bearer auth has a non-empty worker token
/// - Offline threshold is positive
/// - Email channel has a sender and a recipient
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.auth.method == AuthMethod::Bearer
        && config.auth.worker_token.as_deref().unwrap_or("").is_empty()
    {
        return Err(ConfigError::ValidationError(
            "auth.worker_token must be set when using bearer auth".to_string(),
        ));
    }

    if config.worker.offline_threshold_secs == 0 {
        return Err(ConfigError::ValidationError(
            "worker.offline_threshold_secs must be greater than 0".to_string(),
        ));
    }

    if config.notifications.buffer_size == 0 {
        return Err(ConfigError::ValidationError(
            "notifications.buffer_size must be greater than 0".to_string(),
        ));
    }

    if let Some(email) = &config.notifications.email {
        if email.sender.trim().is_empty() || email.recipient.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "notifications.email requires sender and recipient".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn config_from(toml: &str) -> Config {
        load_config_from_str(toml).unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        let config = config_from(
            r#"
[auth]
method = "bearer"
worker_token = "secret"
"#,
        );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let config = config_from(
            r#"
[auth]
method = "none"

[server]
port = 0
"#,
        );
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_bearer_without_token_fails() {
        let config = config_from(
            r#"
[auth]
method = "bearer"
worker_token = ""
"#,
        );
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("worker_token"));
    }

    #[test]
    fn test_validate_zero_threshold_fails() {
        let config = config_from(
            r#"
[auth]
method = "none"

[worker]
offline_threshold_secs = 0
"#,
        );
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_email_without_recipient_fails() {
        let config = config_from(
            r#"
[auth]
method = "none"

[notifications.email]
endpoint = "https://mail.example.com/send"
api_key = "key"
sender = "bot@example.com"
recipient = " "
"#,
        );
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("recipient"));
    }
}
