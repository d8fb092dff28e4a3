//! Push notifications through an HTTP push gateway.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{Notification, Notifier, NotifyError, PushTokenStore};
use crate::config::PushConfig;

#[derive(Debug, Serialize)]
struct PushMessage<'a> {
    registration_ids: Vec<String>,
    notification: PushBanner<'a>,
    data: &'a std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct PushBanner<'a> {
    title: &'a str,
    body: &'a str,
}

/// Sends every notification to all registered devices.
pub struct PushNotifier {
    client: Client,
    config: PushConfig,
    tokens: Arc<dyn PushTokenStore>,
}

impl PushNotifier {
    pub fn new(config: PushConfig, tokens: Arc<dyn PushTokenStore>) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NotifyError::Http(e.to_string()))?;

        Ok(Self {
            client,
            config,
            tokens,
        })
    }
}

#[async_trait]
impl Notifier for PushNotifier {
    fn channel(&self) -> &str {
        "push"
    }

    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let registration_ids = self.tokens.tokens()?;
        if registration_ids.is_empty() {
            tracing::warn!(title = %notification.title, "No push tokens registered");
            return Ok(());
        }
        let devices = registration_ids.len();

        let message = PushMessage {
            registration_ids,
            notification: PushBanner {
                title: &notification.title,
                body: &notification.body,
            },
            data: &notification.metadata,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("Authorization", format!("key={}", self.config.server_key))
            .json(&message)
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

        tracing::debug!(devices, title = %notification.title, "Push notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::notify::{NotificationKind, SqlitePushTokenStore};

    fn config() -> PushConfig {
        PushConfig {
            endpoint: "http://127.0.0.1:9/send".to_string(),
            server_key: "server-key".to_string(),
            timeout_secs: 1,
        }
    }

    #[tokio::test]
    async fn test_no_tokens_is_not_an_error() {
        let tokens = Arc::new(SqlitePushTokenStore::new(Database::in_memory().unwrap()));
        let notifier = PushNotifier::new(config(), tokens).unwrap();

        let n = Notification::new(NotificationKind::Purchased, "Order Purchased", "1001");
        assert!(notifier.notify(&n).await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_an_error() {
        let tokens = Arc::new(SqlitePushTokenStore::new(Database::in_memory().unwrap()));
        tokens.upsert("tok-1", None).unwrap();
        let notifier = PushNotifier::new(config(), tokens).unwrap();

        let n = Notification::new(NotificationKind::Purchased, "Order Purchased", "1001");
        assert!(matches!(
            notifier.notify(&n).await,
            Err(NotifyError::Http(_))
        ));
    }

    #[test]
    fn test_message_shape() {
        let n = Notification::new(NotificationKind::TaskFailed, "Task Failed", "1001 - boom")
            .with_metadata("task_id", "4");
        let message = PushMessage {
            registration_ids: vec!["tok-1".to_string()],
            notification: PushBanner {
                title: &n.title,
                body: &n.body,
            },
            data: &n.metadata,
        };

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["registration_ids"][0], "tok-1");
        assert_eq!(value["notification"]["title"], "Task Failed");
        assert_eq!(value["data"]["type"], "task_failed");
        assert_eq!(value["data"]["task_id"], "4");
    }
}
