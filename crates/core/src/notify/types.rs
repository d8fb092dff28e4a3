//! Notification messages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum characters of a failure message shown in the short body.
const FAILURE_PREVIEW_CHARS: usize = 50;

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewOrder,
    NeedsMapping,
    VerificationRequired,
    TaskFailed,
    Purchased,
    WorkerOffline,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewOrder => "new_order",
            NotificationKind::NeedsMapping => "needs_mapping",
            NotificationKind::VerificationRequired => "verification_required",
            NotificationKind::TaskFailed => "task_failed",
            NotificationKind::Purchased => "purchased",
            NotificationKind::WorkerOffline => "worker_offline",
        }
    }
}

/// A message for the operator.
///
/// `title` and `body` are short enough for a push banner; `detail` is the
/// longer text used by channels that have room for it (email).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub detail: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl Notification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, body: impl Into<String>) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert("type".to_string(), kind.as_str().to_string());
        Self {
            kind,
            title: title.into(),
            body: body.into(),
            detail: None,
            metadata,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Detail text, or the body when there is none.
    pub fn long_text(&self) -> &str {
        self.detail.as_deref().unwrap_or(&self.body)
    }

    pub fn new_order(
        order_number: &str,
        external_id: &str,
        item_count: usize,
        email: Option<&str>,
        total_price: f64,
    ) -> Self {
        Self::new(
            NotificationKind::NewOrder,
            "New Order Received",
            format!("Order #{} - {} item(s)", order_number, item_count),
        )
        .with_detail(format!(
            "Order #{}\nItems: {}\nCustomer: {}\nTotal: ${:.2}",
            order_number,
            item_count,
            email.unwrap_or("N/A"),
            total_price
        ))
        .with_metadata("order_id", external_id)
    }

    pub fn needs_mapping(order_number: &str, external_id: &str, labels: &[String]) -> Self {
        Self::new(
            NotificationKind::NeedsMapping,
            "Product Mapping Required",
            format!(
                "Order #{} has {} unmapped product(s)",
                order_number,
                labels.len()
            ),
        )
        .with_detail(format!(
            "Order #{}\n\nUnmapped products:\n{}",
            order_number,
            labels.join("\n")
        ))
        .with_metadata("order_id", external_id)
    }

    pub fn verification_required(order_number: &str, task_id: i64) -> Self {
        Self::new(
            NotificationKind::VerificationRequired,
            "Manual Verification Required",
            format!("{} needs manual login/OTP", order_number),
        )
        .with_detail(format!(
            "Order: {}\nTask ID: {}\n\nLog in to Amazon manually. The worker resumes after verification.",
            order_number, task_id
        ))
        .with_metadata("task_id", task_id.to_string())
    }

    pub fn task_failed(order_number: &str, task_id: i64, error: Option<&str>) -> Self {
        let error = error.unwrap_or("Unknown error");
        let preview: String = error.chars().take(FAILURE_PREVIEW_CHARS).collect();
        Self::new(
            NotificationKind::TaskFailed,
            "Task Failed",
            format!("{} - {}", order_number, preview),
        )
        .with_detail(format!(
            "Order: {}\nTask ID: {}\n\nError: {}",
            order_number, task_id, error
        ))
        .with_metadata("task_id", task_id.to_string())
    }

    pub fn purchased(order_number: &str, task_id: i64, amazon_order_id: Option<&str>) -> Self {
        Self::new(
            NotificationKind::Purchased,
            "Order Purchased",
            format!("{} purchased on Amazon", order_number),
        )
        .with_detail(format!(
            "Order: {}\nTask ID: {}\nAmazon Order ID: {}",
            order_number,
            task_id,
            amazon_order_id.unwrap_or("N/A")
        ))
        .with_metadata("task_id", task_id.to_string())
    }

    pub fn worker_offline(last_heartbeat_at: Option<&str>) -> Self {
        Self::new(
            NotificationKind::WorkerOffline,
            "Worker Offline",
            "Automation worker is not responding. Tasks are paused.",
        )
        .with_detail(format!(
            "Worker last heartbeat: {}\n\nCheck the worker service.",
            last_heartbeat_at.unwrap_or("never")
        ))
    }
}

/// Errors from notification channels and token storage.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
