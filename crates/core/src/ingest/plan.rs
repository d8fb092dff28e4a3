//! Decomposition of an order payload into rows to insert.

use serde_json::Value;

use super::IngestError;
use crate::catalog::CatalogSnapshot;
use crate::order::{LineItemPayload, NewLineItem, NewOrder, OrderPayload, PlannedLineItem};
use crate::task::{NewTask, TaskState};

pub const DEFAULT_TITLE: &str = "Unknown Product";
pub const NO_IDENTIFIER_ERROR: &str = "no identifier provided";

/// Everything one ingestion writes, decided before touching storage.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestPlan {
    pub order: NewOrder,
    pub items: Vec<PlannedLineItem>,
}

/// Unique task key for a line item: `"<order id>:<line item id or index>"`.
pub fn task_key(external_order_id: &str, line_item_id: Option<&str>, index: usize) -> String {
    match line_item_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => format!("{}:{}", external_order_id, id),
        None => format!("{}:{}", external_order_id, index),
    }
}

/// Build the order row and one planned task per line item.
///
/// Blank SKUs and SKUs missing from `catalog` become `needs_mapping` tasks;
/// everything else becomes a `queued` task carrying the catalog's purchase URL.
pub fn plan_ingest(
    payload: &OrderPayload,
    catalog: &CatalogSnapshot,
) -> Result<IngestPlan, IngestError> {
    let external_id = payload
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| IngestError::InvalidPayload("Missing order id".to_string()))?
        .to_string();

    let order = NewOrder {
        shopify_order_number: payload
            .order_number
            .clone()
            .unwrap_or_else(|| external_id.clone()),
        customer_name: payload.customer_name(),
        customer_email: payload.email.clone().unwrap_or_default(),
        shipping_address: payload
            .shipping_address
            .clone()
            .unwrap_or_else(|| Value::Object(Default::default())),
        total_price: payload.total_price.unwrap_or(0.0),
        shopify_order_id: external_id,
    };

    let items = payload
        .line_items
        .iter()
        .enumerate()
        .map(|(index, line)| plan_line_item(&order.shopify_order_id, index, line, catalog))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(IngestPlan { order, items })
}

fn plan_line_item(
    external_order_id: &str,
    index: usize,
    line: &LineItemPayload,
    catalog: &CatalogSnapshot,
) -> Result<PlannedLineItem, IngestError> {
    let quantity = line.quantity.unwrap_or(1);
    if quantity < 1 {
        return Err(IngestError::InvalidPayload(format!(
            "Line item {} has quantity {}",
            index, quantity
        )));
    }

    let title = line
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let sku = line.sku.as_deref().map(str::trim).unwrap_or("");
    let unique_key = task_key(external_order_id, line.id.as_deref(), index);

    let (task, mapping_label) = if sku.is_empty() {
        (
            NewTask {
                unique_key,
                asin: None,
                amazon_url: None,
                quantity,
                state: TaskState::NeedsMapping,
                error_message: Some(NO_IDENTIFIER_ERROR.to_string()),
            },
            Some(format!("{} (no SKU)", title)),
        )
    } else if let Some(product) = catalog.resolve(sku) {
        (
            NewTask {
                unique_key,
                asin: Some(product.asin.clone()),
                amazon_url: Some(product.amazon_url.clone()),
                quantity,
                state: TaskState::Queued,
                error_message: None,
            },
            None,
        )
    } else {
        (
            NewTask {
                unique_key,
                asin: Some(sku.to_string()),
                amazon_url: None,
                quantity,
                state: TaskState::NeedsMapping,
                error_message: Some(format!("ASIN {} not in catalog", sku)),
            },
            Some(format!("{} (ASIN: {})", title, sku)),
        )
    };

    Ok(PlannedLineItem {
        line_item: NewLineItem {
            shopify_line_item_id: line.id.clone(),
            title,
            variant_title: line.variant_title.clone(),
            sku: (!sku.is_empty()).then(|| sku.to_string()),
            quantity,
            price: line.price.unwrap_or(0.0),
        },
        task,
        mapping_label,
    })
}
