//! Order webhook handler.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use fulfillment_core::{
    IngestError, IngestResult, OrderPayload, SignatureError, SIGNATURE_HEADER,
};
use std::sync::Arc;

use super::handlers::{error_response, internal_error, ApiError};
use crate::metrics::WEBHOOK_SIGNATURE_FAILURES;
use crate::state::AppState;

/// POST /api/webhook/order-created
///
/// The raw body is verified before it is parsed, so the signature covers
/// exactly the bytes the order source sent.
pub async fn order_created(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<IngestResult>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    if let Err(e) = state.verifier().verify(&body, signature) {
        let reason = match e {
            SignatureError::Missing => "missing",
            SignatureError::Malformed => "malformed",
            SignatureError::Mismatch => "mismatch",
        };
        WEBHOOK_SIGNATURE_FAILURES.with_label_values(&[reason]).inc();
        tracing::warn!(reason, "Rejected order webhook");
        return Err(error_response(StatusCode::UNAUTHORIZED, "Invalid signature"));
    }

    let payload: OrderPayload = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(error = %e, "Unparseable order webhook");
        error_response(StatusCode::BAD_REQUEST, "Invalid order payload")
    })?;

    match state.ingestor().ingest(&payload) {
        Ok(result) => Ok(Json(result)),
        Err(IngestError::InvalidPayload(message)) => {
            Err(error_response(StatusCode::BAD_REQUEST, message))
        }
        Err(e) => Err(internal_error("Order ingestion failed", e)),
    }
}
