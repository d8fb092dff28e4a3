//! Notification channel trait and the logging fallback.

use async_trait::async_trait;

use super::{Notification, NotifyError};

/// A delivery channel for operator notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Channel name, used in logs and metrics.
    fn channel(&self) -> &str;

    /// Deliver one notification.
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log.
///
/// Used when no other channel is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn channel(&self) -> &str {
        "log"
    }

    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            kind = notification.kind.as_str(),
            title = %notification.title,
            body = %notification.body,
            "Notification"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationKind;

    #[test]
    fn test_log_notifier_always_succeeds() {
        let notifier = LogNotifier;
        let n = Notification::new(NotificationKind::NewOrder, "title", "body");
        assert!(tokio_test::block_on(notifier.notify(&n)).is_ok());
        assert_eq!(notifier.channel(), "log");
    }
}
