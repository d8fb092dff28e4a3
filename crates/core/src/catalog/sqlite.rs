//! SQLite-backed product catalog implementation.

use chrono::Utc;
use rusqlite::{params, Connection};

use super::{CatalogError, CatalogSnapshot, ImportSummary, Product, ProductCatalog, ProductImport};
use crate::db::{format_timestamp, parse_timestamp, Database};

const PRODUCT_COLUMNS: &str = "id, sku, asin, amazon_url, product_name, buy_price, sell_price, category, is_active, stock_status, notes, updated_at";

/// SQLite-backed product catalog.
pub struct SqliteProductCatalog {
    db: Database,
}

impl SqliteProductCatalog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn row_to_product(row: &rusqlite::Row) -> rusqlite::Result<Product> {
        let updated_at: String = row.get(11)?;
        Ok(Product {
            id: row.get(0)?,
            sku: row.get(1)?,
            asin: row.get(2)?,
            amazon_url: row.get(3)?,
            product_name: row.get(4)?,
            buy_price: row.get(5)?,
            sell_price: row.get(6)?,
            category: row.get(7)?,
            is_active: row.get(8)?,
            stock_status: row.get(9)?,
            notes: row.get(10)?,
            updated_at: parse_timestamp(11, &updated_at)?,
        })
    }

    fn query_products(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Product>, CatalogError> {
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| CatalogError::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params, Self::row_to_product)
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| CatalogError::Database(e.to_string()))
    }
}

impl ProductCatalog for SqliteProductCatalog {
    fn resolve(&self, sku: &str) -> Result<Option<Product>, CatalogError> {
        let conn = self
            .db
            .lock()
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let result = conn.query_row(
            &format!(
                "SELECT {} FROM products WHERE sku = ? AND is_active = 1",
                PRODUCT_COLUMNS
            ),
            params![sku],
            Self::row_to_product,
        );

        match result {
            Ok(product) => Ok(Some(product)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(CatalogError::Database(e.to_string())),
        }
    }

    fn snapshot(&self) -> Result<CatalogSnapshot, CatalogError> {
        let conn = self
            .db
            .lock()
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let products = Self::query_products(
            &conn,
            &format!("SELECT {} FROM products WHERE is_active = 1", PRODUCT_COLUMNS),
            [],
        )?;
        Ok(CatalogSnapshot::new(products))
    }

    fn list(&self) -> Result<Vec<Product>, CatalogError> {
        let conn = self
            .db
            .lock()
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        Self::query_products(
            &conn,
            &format!(
                "SELECT {} FROM products ORDER BY product_name, sku",
                PRODUCT_COLUMNS
            ),
            [],
        )
    }

    fn import(&self, products: &[ProductImport]) -> Result<ImportSummary, CatalogError> {
        if products.is_empty() {
            return Err(CatalogError::EmptyImport);
        }

        let mut conn = self
            .db
            .lock()
            .map_err(|e| CatalogError::Database(e.to_string()))?;
        let tx = conn
            .transaction()
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let now = format_timestamp(&Utc::now());
        let mut summary = ImportSummary::default();

        for (index, product) in products.iter().enumerate() {
            if let Some(reason) = product.rejection_reason() {
                tracing::warn!(index, reason, "Skipping catalog entry");
                summary.skipped.push(format!("#{}: {}", index, reason));
                continue;
            }

            tx.execute(
                r#"
                INSERT INTO products
                    (sku, asin, amazon_url, product_name, buy_price, sell_price, category, is_active, stock_status, notes, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(sku) DO UPDATE SET
                    asin = excluded.asin,
                    amazon_url = excluded.amazon_url,
                    product_name = excluded.product_name,
                    buy_price = excluded.buy_price,
                    sell_price = excluded.sell_price,
                    category = excluded.category,
                    is_active = excluded.is_active,
                    stock_status = excluded.stock_status,
                    notes = excluded.notes,
                    updated_at = excluded.updated_at
                "#,
                params![
                    product.sku.trim(),
                    product.asin.trim(),
                    product.amazon_url.trim(),
                    product.product_name,
                    product.buy_price,
                    product.sell_price,
                    product.category,
                    product.is_active,
                    product.stock_status,
                    product.notes,
                    now,
                ],
            )
            .map_err(|e| CatalogError::Database(e.to_string()))?;
            summary.imported += 1;
        }

        tx.commit()
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        tracing::info!(
            imported = summary.imported,
            skipped = summary.skipped.len(),
            "Catalog import complete"
        );
        Ok(summary)
    }
}
