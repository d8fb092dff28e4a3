//! Product catalog handlers.

use axum::{extract::State, http::StatusCode, Json};
use fulfillment_core::{CatalogError, Product, ProductImport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::extract::ApiJson;
use super::handlers::{error_response, internal_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
pub struct ImportBody {
    #[serde(default)]
    pub products: Vec<ProductImport>,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub status: &'static str,
    pub count: usize,
    /// Rejected entries, e.g. `"#2: missing asin"`.
    pub skipped: Vec<String>,
}

/// GET /api/catalog
pub async fn list_catalog(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CatalogResponse>, ApiError> {
    let products = state
        .catalog()
        .list()
        .map_err(|e| internal_error("Failed to list catalog", e))?;
    Ok(Json(CatalogResponse { products }))
}

/// POST /api/catalog/import
pub async fn import_catalog(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<ImportBody>,
) -> Result<Json<ImportResponse>, ApiError> {
    match state.catalog().import(&body.products) {
        Ok(summary) => {
            tracing::info!(
                imported = summary.imported,
                skipped = summary.skipped.len(),
                "Catalog imported"
            );
            Ok(Json(ImportResponse {
                status: "imported",
                count: summary.imported,
                skipped: summary.skipped,
            }))
        }
        Err(CatalogError::EmptyImport) => Err(error_response(
            StatusCode::BAD_REQUEST,
            CatalogError::EmptyImport.to_string(),
        )),
        Err(e) => Err(internal_error("Catalog import failed", e)),
    }
}
