//! Order storage trait.

use super::{IngestOutcome, NewOrder, OrderDetail, OrderError, OrderSummary, PlannedLineItem};

/// Default number of orders returned by [`OrderStore::list_recent`].
pub const RECENT_ORDERS_LIMIT: usize = 100;

/// Trait for order storage backends.
pub trait OrderStore: Send + Sync {
    /// Record an order with its line items and tasks, all or nothing.
    ///
    /// If `order.shopify_order_id` is already stored, nothing is written and
    /// the counts of the existing tasks are returned instead. Items whose task
    /// key is already taken are skipped.
    fn ingest(
        &self,
        order: &NewOrder,
        items: &[PlannedLineItem],
    ) -> Result<IngestOutcome, OrderError>;

    /// Most recent orders first, with per-state task counts.
    fn list_recent(&self, limit: usize) -> Result<Vec<OrderSummary>, OrderError>;

    /// One order with each line item joined to its task.
    fn get_detail(&self, id: i64) -> Result<Option<OrderDetail>, OrderError>;
}
