//! Email notifications through an HTTP mail relay.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{Notification, Notifier, NotifyError};
use crate::config::EmailConfig;

#[derive(Debug, Serialize)]
struct EmailMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

pub struct EmailNotifier {
    client: Client,
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NotifyError::Http(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn message<'a>(&'a self, notification: &'a Notification) -> EmailMessage<'a> {
        EmailMessage {
            from: &self.config.sender,
            to: &self.config.recipient,
            subject: &notification.title,
            text: notification.long_text(),
        }
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn channel(&self) -> &str {
        "email"
    }

    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&self.message(notification))
            .send()
            .await
            .map_err(|e| NotifyError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NotifyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!(subject = %notification.title, "Email sent");
        Ok(())
    }
}
