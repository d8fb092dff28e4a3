//! Order data types: the inbound webhook payload and the persisted records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::task::{NewTask, TaskState};

// ============================================================================
// Webhook Payload
// ============================================================================

/// Order as delivered by the order-created webhook.
///
/// Identifiers and prices arrive either as JSON strings or numbers.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OrderPayload {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub order_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "de_opt_amount")]
    pub total_price: Option<f64>,
    #[serde(default)]
    pub shipping_address: Option<Value>,
    #[serde(default)]
    pub line_items: Vec<LineItemPayload>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LineItemPayload {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub variant_title: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default, deserialize_with = "de_opt_amount")]
    pub price: Option<f64>,
}

impl OrderPayload {
    /// Display number, falling back to the external id.
    pub fn display_number(&self) -> String {
        self.order_number
            .clone()
            .or_else(|| self.id.clone())
            .unwrap_or_default()
    }

    /// `"<first_name> <last_name>"` from the shipping address, trimmed.
    pub fn customer_name(&self) -> String {
        let field = |name: &str| {
            self.shipping_address
                .as_ref()
                .and_then(|a| a.get(name))
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string()
        };
        format!("{} {}", field("first_name"), field("last_name"))
            .trim()
            .to_string()
    }
}

fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number identifier, got {}",
            other
        ))),
    }
}

fn de_opt_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("amount out of range")),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid amount: {:?}", s))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number amount, got {}",
            other
        ))),
    }
}

// ============================================================================
// Ingestion Inputs
// ============================================================================

/// Order row to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub shopify_order_id: String,
    pub shopify_order_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub shipping_address: Value,
    pub total_price: f64,
}

/// Line item row to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLineItem {
    pub shopify_line_item_id: Option<String>,
    pub title: String,
    pub variant_title: Option<String>,
    pub sku: Option<String>,
    pub quantity: i64,
    pub price: f64,
}

/// A line item together with the single task it decomposes into.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedLineItem {
    pub line_item: NewLineItem,
    pub task: NewTask,
    /// Label listed in the mapping-required notification, for `needs_mapping` tasks.
    pub mapping_label: Option<String>,
}

/// What happened to an ingested order.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// The external id was already recorded; nothing was written.
    AlreadyProcessed {
        order_id: i64,
        tasks_created: usize,
        needs_mapping: usize,
    },
    /// The order and all of its rows were committed.
    Created {
        order_id: i64,
        tasks_created: usize,
        /// Labels of the line items that need mapping.
        needs_mapping: Vec<String>,
    },
}

// ============================================================================
// Persisted Records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub shopify_order_id: String,
    pub shopify_order_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub shipping_address: Value,
    pub total_price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order with per-state task counts, for the dashboard list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    #[serde(flatten)]
    pub order: Order,
    pub total_tasks: i64,
    /// Tasks in `purchased`.
    pub completed_tasks: i64,
    pub verification_tasks: i64,
    pub mapping_tasks: i64,
    pub failed_tasks: i64,
}

/// A line item joined with its task, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Line item ID.
    pub id: i64,
    pub shopify_line_item_id: Option<String>,
    pub title: String,
    pub variant_title: Option<String>,
    pub sku: Option<String>,
    pub quantity: i64,
    pub price: f64,
    pub task_id: Option<i64>,
    pub state: Option<TaskState>,
    pub amazon_url: Option<String>,
    pub amazon_order_id: Option<String>,
    pub error_message: Option<String>,
    pub last_action: Option<String>,
    pub task_quantity: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Errors for order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Database error: {0}")]
    Database(String),
}
