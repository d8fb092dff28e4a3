use axum::{extract::State, http::StatusCode, Json};
use fulfillment_core::NotifyError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::extract::ApiJson;
use super::handlers::{error_response, internal_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubscribeBody {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub device_label: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub status: &'static str,
}

/// POST /api/push/subscribe
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<SubscribeBody>,
) -> Result<Json<SubscribeResponse>, ApiError> {
    let token = body.token.unwrap_or_default();

    match state
        .push_tokens()
        .upsert(&token, body.device_label.as_deref())
    {
        Ok(()) => {
            tracing::info!(
                device = body.device_label.as_deref().unwrap_or("Unknown"),
                "Push token registered"
            );
            Ok(Json(SubscribeResponse {
                status: "subscribed",
            }))
        }
        Err(NotifyError::InvalidInput(message)) => {
            Err(error_response(StatusCode::BAD_REQUEST, message))
        }
        Err(e) => Err(internal_error("Failed to register push token", e)),
    }
}
