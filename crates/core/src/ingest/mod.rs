//! Order ingestion: payload in, order/line item/task rows out.

mod plan;

pub use plan::*;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{CatalogError, ProductCatalog};
use crate::metrics;
use crate::notify::{Notification, NotificationHandle};
use crate::order::{IngestOutcome, OrderError, OrderPayload, OrderStore};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid order payload: {0}")]
    InvalidPayload(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Order storage error: {0}")]
    Order(#[from] OrderError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    Success,
    AlreadyProcessed,
}

/// Response to an ingestion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResult {
    pub status: IngestStatus,
    /// Tasks not in `needs_mapping`.
    pub tasks_created: usize,
    /// Tasks in `needs_mapping`.
    pub needs_mapping: usize,
}

/// Turns order payloads into persisted orders and tasks.
pub struct OrderIngestor {
    orders: Arc<dyn OrderStore>,
    catalog: Arc<dyn ProductCatalog>,
    notifications: NotificationHandle,
}

impl OrderIngestor {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        catalog: Arc<dyn ProductCatalog>,
        notifications: NotificationHandle,
    ) -> Self {
        Self {
            orders,
            catalog,
            notifications,
        }
    }

    /// Ingest one order.
    ///
    /// Either every row for the order is committed or none is. Notifications
    /// go out only after the commit, and never on replay.
    pub fn ingest(&self, payload: &OrderPayload) -> Result<IngestResult, IngestError> {
        let result = self.ingest_inner(payload);
        if let Err(e) = &result {
            let label = match e {
                IngestError::InvalidPayload(_) => "rejected",
                _ => "failed",
            };
            metrics::ORDERS_INGESTED.with_label_values(&[label]).inc();
        }
        result
    }

    fn ingest_inner(&self, payload: &OrderPayload) -> Result<IngestResult, IngestError> {
        let snapshot = self.catalog.snapshot()?;
        let plan = plan_ingest(payload, &snapshot)?;

        match self.orders.ingest(&plan.order, &plan.items)? {
            IngestOutcome::AlreadyProcessed {
                order_id,
                tasks_created,
                needs_mapping,
            } => {
                tracing::warn!(
                    shopify_order_id = %plan.order.shopify_order_id,
                    order_id,
                    "Order already processed"
                );
                metrics::ORDERS_INGESTED
                    .with_label_values(&["replayed"])
                    .inc();

                Ok(IngestResult {
                    status: IngestStatus::AlreadyProcessed,
                    tasks_created,
                    needs_mapping,
                })
            }
            IngestOutcome::Created {
                order_id,
                tasks_created,
                needs_mapping,
            } => {
                tracing::info!(
                    shopify_order_id = %plan.order.shopify_order_id,
                    order_id,
                    tasks_created,
                    needs_mapping = needs_mapping.len(),
                    "Order ingested"
                );
                metrics::ORDERS_INGESTED.with_label_values(&["created"]).inc();
                metrics::TASKS_CREATED
                    .with_label_values(&["queued"])
                    .inc_by(tasks_created as u64);
                metrics::TASKS_CREATED
                    .with_label_values(&["needs_mapping"])
                    .inc_by(needs_mapping.len() as u64);
                metrics::ORDER_LINE_ITEMS
                    .with_label_values(&[])
                    .observe(payload.line_items.len() as f64);

                let order = &plan.order;
                self.notifications.try_emit(Notification::new_order(
                    &order.shopify_order_number,
                    &order.shopify_order_id,
                    payload.line_items.len(),
                    payload.email.as_deref().filter(|e| !e.is_empty()),
                    order.total_price,
                ));
                if !needs_mapping.is_empty() {
                    self.notifications.try_emit(Notification::needs_mapping(
                        &order.shopify_order_number,
                        &order.shopify_order_id,
                        &needs_mapping,
                    ));
                }

                Ok(IngestResult {
                    status: IngestStatus::Success,
                    tasks_created,
                    needs_mapping: needs_mapping.len(),
                })
            }
        }
    }
}
