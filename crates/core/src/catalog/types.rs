//! Product catalog types.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A purchasable product, keyed by SKU.
///
/// By convention the SKU used in the storefront equals the marketplace ASIN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub sku: String,
    pub asin: String,
    pub amazon_url: String,
    pub product_name: String,
    pub buy_price: Option<f64>,
    pub sell_price: Option<f64>,
    pub category: Option<String>,
    pub is_active: bool,
    pub stock_status: String,
    pub notes: String,
    pub updated_at: DateTime<Utc>,
}

/// One entry of a catalog import payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductImport {
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub asin: String,
    #[serde(default)]
    pub amazon_url: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub buy_price: Option<f64>,
    #[serde(default)]
    pub sell_price: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    #[serde(default = "default_stock_status")]
    pub stock_status: String,
    #[serde(default)]
    pub notes: String,
}

fn default_is_active() -> bool {
    true
}

fn default_stock_status() -> String {
    "in_stock".to_string()
}

impl ProductImport {
    /// Minimal active entry, mostly useful in tests and seed scripts.
    pub fn new(
        sku: impl Into<String>,
        asin: impl Into<String>,
        amazon_url: impl Into<String>,
    ) -> Self {
        Self {
            sku: sku.into(),
            asin: asin.into(),
            amazon_url: amazon_url.into(),
            product_name: String::new(),
            buy_price: None,
            sell_price: None,
            category: None,
            is_active: true,
            stock_status: default_stock_status(),
            notes: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.product_name = name.into();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Reason this entry cannot be imported, if any.
    pub fn rejection_reason(&self) -> Option<&'static str> {
        if self.sku.trim().is_empty() {
            Some("missing sku")
        } else if self.asin.trim().is_empty() {
            Some("missing asin")
        } else if self.amazon_url.trim().is_empty() {
            Some("missing amazon_url")
        } else {
            None
        }
    }
}

/// Result of a catalog import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Number of products inserted or replaced.
    pub imported: usize,
    /// One line per rejected entry, e.g. `"#2: missing asin"`.
    pub skipped: Vec<String>,
}

/// Active products loaded at one point in time.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    products: HashMap<String, Product>,
}

impl CatalogSnapshot {
    pub fn new(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: products
                .into_iter()
                .filter(|p| p.is_active)
                .map(|p| (p.sku.clone(), p))
                .collect(),
        }
    }

    /// Exact, case-sensitive SKU match.
    pub fn resolve(&self, sku: &str) -> Option<&Product> {
        self.products.get(sku)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// Errors for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("No products provided")]
    EmptyImport,
}
