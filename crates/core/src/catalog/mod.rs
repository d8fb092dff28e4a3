//! Product catalog - maps storefront SKUs to purchasable marketplace items.
//!
//! Ingestion loads a fresh [`CatalogSnapshot`] for every order so concurrent
//! catalog edits are picked up without any cache invalidation.

mod sqlite;
mod types;

pub use sqlite::SqliteProductCatalog;
pub use types::*;

/// Trait for product catalog storage.
pub trait ProductCatalog: Send + Sync {
    /// Look up one active product by exact SKU.
    fn resolve(&self, sku: &str) -> Result<Option<Product>, CatalogError>;

    /// Load all active products.
    fn snapshot(&self) -> Result<CatalogSnapshot, CatalogError>;

    /// List every product (active or not), ordered by name.
    fn list(&self) -> Result<Vec<Product>, CatalogError>;

    /// Upsert products keyed by SKU.
    ///
    /// Entries without a SKU, ASIN or URL are skipped and reported; the rest
    /// are written in one transaction.
    fn import(&self, products: &[ProductImport]) -> Result<ImportSummary, CatalogError>;
}
