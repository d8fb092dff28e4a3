mod bearer;
mod none;
mod signature;
mod traits;
mod types;

pub use bearer::*;
pub use none::*;
pub use signature::*;
pub use traits::*;
pub use types::*;

use crate::config::{AuthConfig, AuthMethod};

/// Factory function to create the worker authenticator from config
pub fn create_authenticator(config: &AuthConfig) -> Result<Box<dyn Authenticator>, AuthError> {
    match config.method {
        AuthMethod::None => Ok(Box::new(NoneAuthenticator::new())),
        AuthMethod::Bearer => {
            let token = config
                .worker_token
                .clone()
                .filter(|t| !t.is_empty())
                .ok_or_else(|| {
                    AuthError::ConfigurationError(
                        "worker_token must be set when using bearer auth".to_string(),
                    )
                })?;
            Ok(Box::new(BearerTokenAuthenticator::new(token)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_authenticator_none() {
        let config = AuthConfig {
            method: AuthMethod::None,
            worker_token: None,
        };
        let auth = create_authenticator(&config).unwrap();
        assert_eq!(auth.method_name(), "none");
    }

    #[test]
    fn test_create_authenticator_bearer() {
        let config = AuthConfig {
            method: AuthMethod::Bearer,
            worker_token: Some("secret".to_string()),
        };
        let auth = create_authenticator(&config).unwrap();
        assert_eq!(auth.method_name(), "bearer");
    }

    #[test]
    fn test_create_authenticator_bearer_missing_token() {
        let config = AuthConfig {
            method: AuthMethod::Bearer,
            worker_token: Some(String::new()),
        };
        let result = create_authenticator(&config);
        assert!(matches!(result, Err(AuthError::ConfigurationError(_))));
    }
}
