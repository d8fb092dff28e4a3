//! Worker liveness handlers.

use axum::{extract::State, Json};
use fulfillment_core::StatusReport;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::extract::ApiJson;
use super::handlers::{internal_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct HeartbeatBody {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HeartbeatResponse {
    pub status: &'static str,
}

/// POST /api/worker/heartbeat
///
/// The body is optional; a bare POST records a plain heartbeat.
pub async fn heartbeat(
    State(state): State<Arc<AppState>>,
    body: Option<ApiJson<HeartbeatBody>>,
) -> Result<Json<HeartbeatResponse>, ApiError> {
    let ApiJson(body) = body.unwrap_or_default();

    state
        .monitor()
        .heartbeat(body.action.as_deref(), body.error.as_deref())
        .map_err(|e| internal_error("Failed to record heartbeat", e))?;

    Ok(Json(HeartbeatResponse { status: "ok" }))
}

/// GET /api/status
///
/// Refreshes liveness first, so polling this route is what raises offline alerts.
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusReport>, ApiError> {
    state
        .monitor()
        .status_report()
        .map(Json)
        .map_err(|e| internal_error("Failed to read worker status", e))
}
