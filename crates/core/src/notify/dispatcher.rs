//! Asynchronous fan-out of notifications to every configured channel.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc;

use super::{
    EmailNotifier, LogNotifier, Notification, Notifier, PushNotifier, PushTokenStore,
};
use crate::config::NotificationsConfig;
use crate::metrics;

/// Handle for emitting notifications.
///
/// Cheaply cloneable. Notifications are queued on a bounded channel and
/// delivered by the [`NotificationDispatcher`]; emitting never fails the caller.
#[derive(Clone)]
pub struct NotificationHandle {
    tx: mpsc::Sender<Notification>,
}

impl NotificationHandle {
    pub fn new(tx: mpsc::Sender<Notification>) -> Self {
        Self { tx }
    }

    /// Queue a notification without waiting.
    ///
    /// Returns false (and logs) if the channel is full or closed.
    pub fn try_emit(&self, notification: Notification) -> bool {
        match self.tx.try_send(notification) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to queue notification: {}", e);
                false
            }
        }
    }
}

/// Background task delivering queued notifications.
pub struct NotificationDispatcher {
    rx: mpsc::Receiver<Notification>,
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl NotificationDispatcher {
    pub fn new(rx: mpsc::Receiver<Notification>, notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self { rx, notifiers }
    }

    /// Deliver notifications until every handle is dropped.
    ///
    /// Spawn with `tokio::spawn(dispatcher.run())`.
    pub async fn run(mut self) {
        tracing::info!(channels = self.notifiers.len(), "Notification dispatcher started");

        while let Some(notification) = self.rx.recv().await {
            deliver(&self.notifiers, &notification).await;
        }

        tracing::info!("Notification dispatcher shutting down");
    }
}

/// Send one notification to all channels concurrently, logging failures.
async fn deliver(notifiers: &[Arc<dyn Notifier>], notification: &Notification) {
    let results = join_all(notifiers.iter().map(|n| n.notify(notification))).await;

    for (notifier, result) in notifiers.iter().zip(results) {
        match result {
            Ok(()) => {
                metrics::NOTIFICATIONS
                    .with_label_values(&[notifier.channel(), "success"])
                    .inc();
            }
            Err(e) => {
                metrics::NOTIFICATIONS
                    .with_label_values(&[notifier.channel(), "error"])
                    .inc();
                tracing::error!(
                    channel = notifier.channel(),
                    kind = notification.kind.as_str(),
                    error = %e,
                    "Notification delivery failed"
                );
            }
        }
    }
}

/// Create a complete notification system.
///
/// Returns the handle to clone into services and the dispatcher to spawn.
pub fn create_notification_system(
    notifiers: Vec<Arc<dyn Notifier>>,
    buffer_size: usize,
) -> (NotificationHandle, NotificationDispatcher) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (
        NotificationHandle::new(tx),
        NotificationDispatcher::new(rx, notifiers),
    )
}

/// Build the channels enabled in configuration.
///
/// Falls back to [`LogNotifier`] when no channel is enabled or none could be built.
pub fn build_notifiers(
    config: &NotificationsConfig,
    tokens: Arc<dyn PushTokenStore>,
) -> Vec<Arc<dyn Notifier>> {
    let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();

    if let Some(push) = &config.push {
        match PushNotifier::new(push.clone(), tokens) {
            Ok(notifier) => notifiers.push(Arc::new(notifier)),
            Err(e) => tracing::error!("Push notifications disabled: {}", e),
        }
    }

    if let Some(email) = &config.email {
        match EmailNotifier::new(email.clone()) {
            Ok(notifier) => notifiers.push(Arc::new(notifier)),
            Err(e) => tracing::error!("Email notifications disabled: {}", e),
        }
    }

    if notifiers.is_empty() {
        tracing::warn!("No notification channel configured, notifications will only be logged");
        notifiers.push(Arc::new(LogNotifier));
    }

    notifiers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EmailConfig, PushConfig};
    use crate::db::Database;
    use crate::notify::{NotificationKind, SqlitePushTokenStore};
    use crate::testing::RecordingNotifier;

    fn tokens() -> Arc<dyn PushTokenStore> {
        Arc::new(SqlitePushTokenStore::new(Database::in_memory().unwrap()))
    }

    #[tokio::test]
    async fn test_dispatcher_fans_out_to_all_channels() {
        let first = Arc::new(RecordingNotifier::new());
        let second = Arc::new(RecordingNotifier::new());
        let notifiers: Vec<Arc<dyn Notifier>> = vec![first.clone(), second.clone()];
        let (handle, dispatcher) = create_notification_system(notifiers, 8);
        let task = tokio::spawn(dispatcher.run());

        assert!(handle.try_emit(Notification::new(NotificationKind::NewOrder, "a", "b")));
        assert!(handle.try_emit(Notification::new(NotificationKind::Purchased, "c", "d")));
        drop(handle);
        task.await.unwrap();

        assert_eq!(first.kinds(), vec![NotificationKind::NewOrder, NotificationKind::Purchased]);
        assert_eq!(second.kinds(), first.kinds());
    }

    #[tokio::test]
    async fn test_failing_channel_does_not_stop_others() {
        let failing = Arc::new(RecordingNotifier::failing());
        let healthy = Arc::new(RecordingNotifier::new());
        let notifiers: Vec<Arc<dyn Notifier>> = vec![failing.clone(), healthy.clone()];
        let (handle, dispatcher) = create_notification_system(notifiers, 8);
        let task = tokio::spawn(dispatcher.run());

        assert!(handle.try_emit(Notification::new(NotificationKind::TaskFailed, "x", "y")));
        assert!(handle.try_emit(Notification::new(NotificationKind::WorkerOffline, "x", "y")));
        drop(handle);
        task.await.unwrap();

        assert_eq!(healthy.kinds().len(), 2);
        assert_eq!(failing.kinds().len(), 2);
    }

    #[test]
    fn test_try_emit_full_channel_returns_false() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = NotificationHandle::new(tx);

        assert!(handle.try_emit(Notification::new(NotificationKind::NewOrder, "1", "1")));
        assert!(!handle.try_emit(Notification::new(NotificationKind::NewOrder, "2", "2")));
    }

    #[test]
    fn test_try_emit_closed_channel_returns_false() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let handle = NotificationHandle::new(tx);
        assert!(!handle.try_emit(Notification::new(NotificationKind::NewOrder, "1", "1")));
    }

    #[test]
    fn test_build_notifiers_falls_back_to_log() {
        let notifiers = build_notifiers(&NotificationsConfig::default(), tokens());
        let channels: Vec<_> = notifiers.iter().map(|n| n.channel().to_string()).collect();
        assert_eq!(channels, vec!["log"]);
    }

    #[test]
    fn test_build_notifiers_enables_configured_channels() {
        let config = NotificationsConfig {
            push: Some(PushConfig {
                endpoint: "http://push.invalid/send".to_string(),
                server_key: "k".to_string(),
                timeout_secs: 5,
            }),
            email: Some(EmailConfig {
                endpoint: "http://mail.invalid/send".to_string(),
                api_key: "k".to_string(),
                sender: "a@example.com".to_string(),
                recipient: "b@example.com".to_string(),
                timeout_secs: 5,
            }),
            ..NotificationsConfig::default()
        };

        let channels: Vec<_> = build_notifiers(&config, tokens())
            .iter()
            .map(|n| n.channel().to_string())
            .collect();
        assert_eq!(channels, vec!["push", "email"]);
    }
}
