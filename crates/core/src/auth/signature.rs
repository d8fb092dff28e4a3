//! Order webhook signature verification.
//!
//! The order source signs every delivery with
//! `base64(HMAC-SHA256(shared_secret, raw_body))` in the
//! `X-Shopify-Hmac-Sha256` header.

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "x-shopify-hmac-sha256";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Missing webhook signature")]
    Missing,

    #[error("Malformed webhook signature")]
    Malformed,

    #[error("Webhook signature mismatch")]
    Mismatch,
}

/// Verifies webhook bodies against the configured shared secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Option<Vec<u8>>,
}

impl WebhookVerifier {
    /// An empty or absent secret disables verification.
    pub fn new(secret: Option<&str>) -> Self {
        Self {
            secret: secret
                .filter(|s| !s.is_empty())
                .map(|s| s.as_bytes().to_vec()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    /// Check `signature` (the header value, if any) against `body`.
    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> Result<(), SignatureError> {
        let Some(secret) = &self.secret else {
            tracing::warn!("Webhook secret not configured, skipping signature verification");
            return Ok(());
        };

        let signature = signature.ok_or(SignatureError::Missing)?;
        let expected = STANDARD
            .decode(signature.trim())
            .map_err(|_| SignatureError::Malformed)?;

        let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| SignatureError::Malformed)?;
        mac.update(body);
        mac.verify_slice(&expected)
            .map_err(|_| SignatureError::Mismatch)
    }
}
