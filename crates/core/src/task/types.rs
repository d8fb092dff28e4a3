//! Core task data types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Task State
// ============================================================================

/// Lifecycle state of a purchase task.
///
/// The set is closed: anything else is rejected when parsed, and the schema
/// refuses to store it. Transitions between states are not validated; the
/// worker may assert any state, including a backward one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting to be leased by the worker.
    Queued,
    /// Claimed by the worker, product page opened.
    ProcessingOpenedUrl,
    ProcessingAddedToCart,
    ProcessingCheckout,
    ProcessingPlacingOrder,
    /// The marketplace asked for a manual login or OTP.
    VerificationRequired,
    Failed,
    Purchased,
    /// Line item could not be resolved to a catalog product. Never leased.
    NeedsMapping,
}

impl TaskState {
    pub const ALL: [TaskState; 9] = [
        TaskState::Queued,
        TaskState::ProcessingOpenedUrl,
        TaskState::ProcessingAddedToCart,
        TaskState::ProcessingCheckout,
        TaskState::ProcessingPlacingOrder,
        TaskState::VerificationRequired,
        TaskState::Failed,
        TaskState::Purchased,
        TaskState::NeedsMapping,
    ];

    /// Storage and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Queued => "queued",
            TaskState::ProcessingOpenedUrl => "processing_opened_url",
            TaskState::ProcessingAddedToCart => "processing_added_to_cart",
            TaskState::ProcessingCheckout => "processing_checkout",
            TaskState::ProcessingPlacingOrder => "processing_placing_order",
            TaskState::VerificationRequired => "verification_required",
            TaskState::Failed => "failed",
            TaskState::Purchased => "purchased",
            TaskState::NeedsMapping => "needs_mapping",
        }
    }

    /// Whether the worker currently holds this task.
    pub fn is_processing(&self) -> bool {
        matches!(
            self,
            TaskState::ProcessingOpenedUrl
                | TaskState::ProcessingAddedToCart
                | TaskState::ProcessingCheckout
                | TaskState::ProcessingPlacingOrder
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown task state: {0}")]
pub struct UnknownTaskState(pub String);

impl FromStr for TaskState {
    type Err = UnknownTaskState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| UnknownTaskState(s.to_string()))
    }
}

// ============================================================================
// Task Records
// ============================================================================

/// A persisted purchase task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    /// `"<external order id>:<external line item id or index>"`.
    pub unique_key: String,
    pub order_id: i64,
    pub line_item_id: i64,
    pub asin: Option<String>,
    pub amazon_url: Option<String>,
    pub quantity: i64,
    pub state: TaskState,
    pub amazon_order_id: Option<String>,
    pub error_message: Option<String>,
    pub last_action: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A task handed to the worker, with the order fields it needs to check out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeasedTask {
    #[serde(flatten)]
    pub task: Task,
    pub shopify_order_number: String,
    pub customer_name: String,
    pub shipping_address: serde_json::Value,
}

/// A task joined with display fields for dashboard lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub shopify_order_number: String,
    /// Title of the originating line item.
    pub product_name: String,
}

/// Task to insert during ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub unique_key: String,
    pub asin: Option<String>,
    pub amazon_url: Option<String>,
    pub quantity: i64,
    pub state: TaskState,
    pub error_message: Option<String>,
}

/// State asserted by the worker.
///
/// Optional fields overwrite the stored values, so an omitted field clears it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateReport {
    pub state: TaskState,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub amazon_order_id: Option<String>,
    #[serde(default)]
    pub last_action: Option<String>,
}

impl StateReport {
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            error_message: None,
            amazon_order_id: None,
            last_action: None,
        }
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_amazon_order_id(mut self, id: impl Into<String>) -> Self {
        self.amazon_order_id = Some(id.into());
        self
    }

    pub fn with_last_action(mut self, action: impl Into<String>) -> Self {
        self.last_action = Some(action.into());
        self
    }
}

/// Errors for task operations.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task not found: {0}")]
    NotFound(i64),

    #[error("Database error: {0}")]
    Database(String),
}
