use axum::{extract::State, Json};
use fulfillment_core::{TaskState, TaskView};
use serde::Serialize;
use std::sync::Arc;

use super::handlers::{internal_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskView>,
}

fn list(state: &AppState, task_state: TaskState) -> Result<Json<TaskListResponse>, ApiError> {
    let tasks = state
        .tasks()
        .list_by_state(task_state)
        .map_err(|e| internal_error("Failed to list tasks", e))?;
    Ok(Json(TaskListResponse { tasks }))
}

/// GET /api/tasks/verification-required
pub async fn verification_required(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TaskListResponse>, ApiError> {
    list(&state, TaskState::VerificationRequired)
}

/// GET /api/tasks/needs-mapping
pub async fn needs_mapping(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TaskListResponse>, ApiError> {
    list(&state, TaskState::NeedsMapping)
}
