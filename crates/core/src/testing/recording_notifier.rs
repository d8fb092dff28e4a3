//! Recording notifier for testing.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::notify::{Notification, NotificationKind, Notifier, NotifyError};

/// Notifier that keeps every notification it receives.
///
/// A failing recorder still records, then returns an error, so tests can
/// check that delivery failures are swallowed.
///
/// # Example
///
/// ```rust,ignore
/// use fulfillment_core::testing::RecordingNotifier;
///
/// let recorder = Arc::new(RecordingNotifier::new());
/// let (handle, dispatcher) = create_notification_system(vec![recorder.clone()], 16);
///
/// // ... run the code under test, drop the handle, await dispatcher.run() ...
/// assert_eq!(recorder.kinds(), vec![NotificationKind::NewOrder]);
/// ```
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    received: Mutex<Vec<Notification>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A recorder whose deliveries all fail.
    pub fn failing() -> Self {
        Self {
            received: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Every notification received so far, in order.
    pub fn notifications(&self) -> Vec<Notification> {
        self.received.lock().map(|n| n.clone()).unwrap_or_default()
    }

    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.notifications().iter().map(|n| n.kind).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn channel(&self) -> &str {
        "recording"
    }

    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        if let Ok(mut received) = self.received.lock() {
            received.push(notification.clone());
        }
        if self.fail {
            return Err(NotifyError::Http("simulated delivery failure".to_string()));
        }
        Ok(())
    }
}
