//! Shared SQLite handle and schema.
//!
//! Every store in this crate is built on a clone of the same [`Database`], so
//! orders, line items, tasks, worker status, push tokens and products all
//! live in one file and can be joined and mutated inside one transaction.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use thiserror::Error;

/// How long a connection waits on a locked database file before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Failed to open database: {0}")]
    Open(String),

    #[error("Failed to initialize schema: {0}")]
    Schema(String),

    #[error("Database connection lock poisoned")]
    Poisoned,
}

/// Cloneable handle to a single SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file and make sure the schema exists.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|e| DatabaseError::Open(e.to_string()))?;
        Self::from_connection(conn)
    }

    /// Create an in-memory database (useful for testing).
    pub fn in_memory() -> Result<Self, DatabaseError> {
        let conn =
            Connection::open_in_memory().map_err(|e| DatabaseError::Open(e.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, DatabaseError> {
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| DatabaseError::Open(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Lock the underlying connection.
    pub fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::Poisoned)
    }

    fn initialize_schema(conn: &Connection) -> Result<(), DatabaseError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS orders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                shopify_order_id TEXT NOT NULL UNIQUE,
                shopify_order_number TEXT NOT NULL,
                customer_name TEXT NOT NULL,
                customer_email TEXT NOT NULL,
                shipping_address TEXT NOT NULL,
                total_price REAL NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS line_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                order_id INTEGER NOT NULL REFERENCES orders(id),
                shopify_line_item_id TEXT,
                title TEXT NOT NULL,
                variant_title TEXT,
                sku TEXT,
                quantity INTEGER NOT NULL CHECK (quantity >= 1),
                price REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                unique_key TEXT NOT NULL UNIQUE,
                order_id INTEGER NOT NULL REFERENCES orders(id),
                line_item_id INTEGER NOT NULL REFERENCES line_items(id),
                asin TEXT,
                amazon_url TEXT,
                quantity INTEGER NOT NULL,
                state TEXT NOT NULL CHECK (state IN (
                    'queued',
                    'processing_opened_url',
                    'processing_added_to_cart',
                    'processing_checkout',
                    'processing_placing_order',
                    'verification_required',
                    'failed',
                    'purchased',
                    'needs_mapping'
                )),
                amazon_order_id TEXT,
                error_message TEXT,
                last_action TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_state_created ON tasks(state, created_at, id);
            CREATE INDEX IF NOT EXISTS idx_tasks_order ON tasks(order_id);
            CREATE INDEX IF NOT EXISTS idx_line_items_order ON line_items(order_id);

            CREATE TABLE IF NOT EXISTS worker_status (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                is_online INTEGER NOT NULL DEFAULT 0,
                last_heartbeat_at TEXT,
                last_error TEXT,
                last_action TEXT,
                last_offline_notification_at TEXT
            );

            INSERT OR IGNORE INTO worker_status (id, is_online) VALUES (1, 0);

            CREATE TABLE IF NOT EXISTS push_tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                token TEXT NOT NULL UNIQUE,
                device_label TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sku TEXT NOT NULL UNIQUE,
                asin TEXT NOT NULL,
                amazon_url TEXT NOT NULL,
                product_name TEXT NOT NULL,
                buy_price REAL,
                sell_price REAL,
                category TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                stock_status TEXT NOT NULL DEFAULT 'in_stock',
                notes TEXT NOT NULL DEFAULT '',
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| DatabaseError::Schema(e.to_string()))
    }
}

/// Format a timestamp for storage.
///
/// Fixed microsecond precision keeps lexical and chronological order equal.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp from column `idx` of a row.
pub(crate) fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Like [`parse_timestamp`] for nullable columns.
pub(crate) fn parse_optional_timestamp(
    idx: usize,
    value: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.map(|v| parse_timestamp(idx, &v)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_schema_is_idempotent() {
        let db = Database::in_memory().unwrap();
        let conn = db.lock().unwrap();
        Database::initialize_schema(&conn).unwrap();

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM worker_status", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_worker_status_rejects_second_row() {
        let db = Database::in_memory().unwrap();
        let conn = db.lock().unwrap();

        let result = conn.execute("INSERT INTO worker_status (id, is_online) VALUES (2, 0)", []);
        assert!(result.is_err());
    }

    #[test]
    fn test_tasks_reject_unknown_state() {
        let db = Database::in_memory().unwrap();
        let conn = db.lock().unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO orders (shopify_order_id, shopify_order_number, customer_name, customer_email, shipping_address, total_price, created_at, updated_at)
            VALUES ('1', '#1', '', '', '{}', 0, 'x', 'x');
            INSERT INTO line_items (order_id, title, quantity, price) VALUES (1, 'Item', 1, 0);
            "#,
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO tasks (unique_key, order_id, line_item_id, quantity, state, created_at, updated_at) VALUES ('1:0', 1, 1, 1, 'shipped', 'x', 'x')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_open_file_database_twice_shares_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.db");

        let first = Database::open(&path).unwrap();
        first
            .lock()
            .unwrap()
            .execute(
                "INSERT INTO push_tokens (token, device_label, created_at) VALUES ('abc', 'Phone', 'x')",
                [],
            )
            .unwrap();

        let second = Database::open(&path).unwrap();
        let count: i64 = second
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM push_tokens", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_timestamp_format_sorts_lexically() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 9, 59, 59).unwrap();
        let later = earlier + chrono::Duration::milliseconds(1);

        let a = format_timestamp(&earlier);
        let b = format_timestamp(&later);
        assert!(a < b);
        assert_eq!(parse_timestamp(0, &a).unwrap(), earlier);
    }
}
