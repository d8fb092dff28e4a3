//! Bearer token authentication for the automation worker.

use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Authenticator that validates `Authorization: Bearer <token>` against the
/// configured worker token.
pub struct BearerTokenAuthenticator {
    expected_token: String,
}

impl BearerTokenAuthenticator {
    pub fn new(token: String) -> Self {
        Self {
            expected_token: token,
        }
    }

    fn extract_token<'a>(&self, request: &'a AuthRequest) -> Option<&'a str> {
        request
            .headers
            .get("authorization")
            .and_then(|value| value.strip_prefix("Bearer "))
    }
}

#[async_trait]
impl Authenticator for BearerTokenAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let provided = self
            .extract_token(request)
            .ok_or(AuthError::NotAuthenticated)?;

        if constant_time_eq(provided.as_bytes(), self.expected_token.as_bytes()) {
            Ok(Identity::worker())
        } else {
            Err(AuthError::InvalidCredentials("Invalid worker token".to_string()))
        }
    }

    fn method_name(&self) -> &'static str {
        "bearer"
    }
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    fn make_request(headers: Vec<(&str, &str)>) -> AuthRequest {
        AuthRequest {
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v.to_string()))
                .collect(),
            source_ip: "127.0.0.1".parse::<IpAddr>().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_bearer_token_valid() {
        let auth = BearerTokenAuthenticator::new("worker-token".to_string());
        let request = make_request(vec![("Authorization", "Bearer worker-token")]);

        let identity = auth.authenticate(&request).await.unwrap();

        assert_eq!(identity.user_id, "worker");
        assert_eq!(identity.method, "bearer");
    }

    #[tokio::test]
    async fn test_wrong_token() {
        let auth = BearerTokenAuthenticator::new("worker-token".to_string());
        let request = make_request(vec![("Authorization", "Bearer nope")]);

        let result = auth.authenticate(&request).await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
    }

    #[tokio::test]
    async fn test_missing_header() {
        let auth = BearerTokenAuthenticator::new("worker-token".to_string());

        let result = auth.authenticate(&make_request(vec![])).await;

        assert!(matches!(result, Err(AuthError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_other_scheme_rejected() {
        let auth = BearerTokenAuthenticator::new("worker-token".to_string());
        let request = make_request(vec![("Authorization", "Basic worker-token")]);

        let result = auth.authenticate(&request).await;

        assert!(matches!(result, Err(AuthError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_token_is_matched_exactly() {
        let auth = BearerTokenAuthenticator::new("worker-token".to_string());
        let request = make_request(vec![("Authorization", "Bearer worker-token ")]);

        assert!(auth.authenticate(&request).await.is_err());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hell"));
        assert!(constant_time_eq(b"", b""));
    }
}
