//! Worker queue handlers: lease the next task, report its state.

use axum::{extract::State, http::StatusCode, Json};
use fulfillment_core::{LeasedTask, StateReport, TaskError, TaskState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::extract::{ApiJson, ApiPath};
use super::handlers::{error_response, internal_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct NextTaskResponse {
    /// `null` when the queue is empty.
    pub task: Option<LeasedTask>,
}

/// Request body for a state report.
///
/// `state` is parsed by hand so an unknown value is reported by name.
#[derive(Debug, Deserialize)]
pub struct UpdateTaskBody {
    pub state: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub amazon_order_id: Option<String>,
    #[serde(default)]
    pub last_action: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateTaskResponse {
    pub status: &'static str,
}

/// GET /api/queue/next
pub async fn next_task(
    State(state): State<Arc<AppState>>,
) -> Result<Json<NextTaskResponse>, ApiError> {
    let task = state
        .queue()
        .lease_next()
        .map_err(|e| internal_error("Failed to lease task", e))?;
    Ok(Json(NextTaskResponse { task }))
}

/// POST /api/queue/{task_id}/update
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    ApiPath(task_id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateTaskBody>,
) -> Result<Json<UpdateTaskResponse>, ApiError> {
    let new_state: TaskState = body
        .state
        .parse()
        .map_err(|e: fulfillment_core::task::UnknownTaskState| {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        })?;

    let report = StateReport {
        state: new_state,
        error_message: body.error_message,
        amazon_order_id: body.amazon_order_id,
        last_action: body.last_action,
    };

    match state.queue().report_state(task_id, &report) {
        Ok(_) => Ok(Json(UpdateTaskResponse { status: "updated" })),
        Err(TaskError::NotFound(id)) => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Task not found: {}", id),
        )),
        Err(e) => Err(internal_error("Failed to update task", e)),
    }
}
