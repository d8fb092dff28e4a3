//! Order read views for the dashboard.

use axum::{extract::State, http::StatusCode, Json};
use fulfillment_core::{OrderDetail, OrderSummary, RECENT_ORDERS_LIMIT};
use serde::Serialize;
use std::sync::Arc;

use super::extract::ApiPath;
use super::handlers::{error_response, internal_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ListOrdersResponse {
    pub orders: Vec<OrderSummary>,
}

#[derive(Debug, Serialize)]
pub struct OrderDetailResponse {
    pub order: OrderDetail,
}

/// GET /api/orders
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListOrdersResponse>, ApiError> {
    let orders = state
        .orders()
        .list_recent(RECENT_ORDERS_LIMIT)
        .map_err(|e| internal_error("Failed to list orders", e))?;
    Ok(Json(ListOrdersResponse { orders }))
}

/// GET /api/orders/{id}
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<OrderDetailResponse>, ApiError> {
    match state.orders().get_detail(id) {
        Ok(Some(order)) => Ok(Json(OrderDetailResponse { order })),
        Ok(None) => Err(error_response(StatusCode::NOT_FOUND, "Order not found")),
        Err(e) => Err(internal_error("Failed to load order", e)),
    }
}
