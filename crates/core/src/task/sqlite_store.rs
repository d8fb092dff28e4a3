//! SQLite-backed task store implementation.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::{
    LeasedTask, StateReport, Task, TaskError, TaskState, TaskStore, TaskView, LEASE_ACTION,
};
use crate::db::{format_timestamp, parse_timestamp, Database};

const TASK_COLUMNS: &str = "t.id, t.unique_key, t.order_id, t.line_item_id, t.asin, t.amazon_url, t.quantity, t.state, t.amazon_order_id, t.error_message, t.last_action, t.created_at, t.updated_at";

/// Number of columns produced by [`TASK_COLUMNS`].
const TASK_COLUMN_COUNT: usize = 13;

/// SQLite-backed task store.
pub struct SqliteTaskStore {
    db: Database,
}

impl SqliteTaskStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub(crate) fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
        let state: String = row.get(7)?;
        let created_at: String = row.get(11)?;
        let updated_at: String = row.get(12)?;

        Ok(Task {
            id: row.get(0)?,
            unique_key: row.get(1)?,
            order_id: row.get(2)?,
            line_item_id: row.get(3)?,
            asin: row.get(4)?,
            amazon_url: row.get(5)?,
            quantity: row.get(6)?,
            state: state.parse::<TaskState>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
            })?,
            amazon_order_id: row.get(8)?,
            error_message: row.get(9)?,
            last_action: row.get(10)?,
            created_at: parse_timestamp(11, &created_at)?,
            updated_at: parse_timestamp(12, &updated_at)?,
        })
    }

    fn row_to_view(row: &rusqlite::Row) -> rusqlite::Result<TaskView> {
        Ok(TaskView {
            task: Self::row_to_task(row)?,
            shopify_order_number: row.get(TASK_COLUMN_COUNT)?,
            product_name: row.get(TASK_COLUMN_COUNT + 1)?,
        })
    }

    fn row_to_leased(row: &rusqlite::Row) -> rusqlite::Result<LeasedTask> {
        let address: String = row.get(TASK_COLUMN_COUNT + 2)?;
        let shipping_address = serde_json::from_str(&address).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                TASK_COLUMN_COUNT + 2,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?;

        Ok(LeasedTask {
            task: Self::row_to_task(row)?,
            shopify_order_number: row.get(TASK_COLUMN_COUNT)?,
            customer_name: row.get(TASK_COLUMN_COUNT + 1)?,
            shipping_address,
        })
    }

    fn view_sql(where_clause: &str) -> String {
        format!(
            "SELECT {}, o.shopify_order_number, li.title FROM tasks t JOIN orders o ON t.order_id = o.id JOIN line_items li ON t.line_item_id = li.id {}",
            TASK_COLUMNS, where_clause
        )
    }

    fn get_view(conn: &Connection, id: i64) -> Result<Option<TaskView>, TaskError> {
        conn.query_row(
            &Self::view_sql("WHERE t.id = ?"),
            params![id],
            Self::row_to_view,
        )
        .optional()
        .map_err(|e| TaskError::Database(e.to_string()))
    }
}

impl TaskStore for SqliteTaskStore {
    fn lease_next(&self) -> Result<Option<LeasedTask>, TaskError> {
        let mut conn = self
            .db
            .lock()
            .map_err(|e| TaskError::Database(e.to_string()))?;

        // IMMEDIATE takes the write lock up front, so another connection to the
        // same file cannot select the same row between our read and our write.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| TaskError::Database(e.to_string()))?;

        let now = format_timestamp(&Utc::now());
        let claimed: Option<i64> = tx
            .query_row(
                r#"
                UPDATE tasks
                SET state = 'processing_opened_url', updated_at = ?, last_action = ?
                WHERE id = (
                    SELECT id FROM tasks
                    WHERE state = 'queued'
                    ORDER BY created_at ASC, id ASC
                    LIMIT 1
                )
                AND state = 'queued'
                RETURNING id
                "#,
                params![now, LEASE_ACTION],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| TaskError::Database(e.to_string()))?;

        let leased = match claimed {
            Some(id) => Some(
                tx.query_row(
                    &format!(
                        "SELECT {}, o.shopify_order_number, o.customer_name, o.shipping_address FROM tasks t JOIN orders o ON t.order_id = o.id WHERE t.id = ?",
                        TASK_COLUMNS
                    ),
                    params![id],
                    Self::row_to_leased,
                )
                .map_err(|e| TaskError::Database(e.to_string()))?,
            ),
            None => None,
        };

        tx.commit()
            .map_err(|e| TaskError::Database(e.to_string()))?;

        Ok(leased)
    }

    fn report_state(&self, id: i64, report: &StateReport) -> Result<TaskView, TaskError> {
        let mut conn = self
            .db
            .lock()
            .map_err(|e| TaskError::Database(e.to_string()))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| TaskError::Database(e.to_string()))?;

        let changed = tx
            .execute(
                r#"
                UPDATE tasks
                SET state = ?, error_message = ?, amazon_order_id = ?, last_action = ?, updated_at = ?
                WHERE id = ?
                "#,
                params![
                    report.state.as_str(),
                    report.error_message,
                    report.amazon_order_id,
                    report.last_action,
                    format_timestamp(&Utc::now()),
                    id,
                ],
            )
            .map_err(|e| TaskError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(TaskError::NotFound(id));
        }

        let view = Self::get_view(&tx, id)?.ok_or(TaskError::NotFound(id))?;

        tx.commit()
            .map_err(|e| TaskError::Database(e.to_string()))?;

        Ok(view)
    }

    fn get(&self, id: i64) -> Result<Option<Task>, TaskError> {
        let conn = self
            .db
            .lock()
            .map_err(|e| TaskError::Database(e.to_string()))?;

        conn.query_row(
            &format!("SELECT {} FROM tasks t WHERE t.id = ?", TASK_COLUMNS),
            params![id],
            Self::row_to_task,
        )
        .optional()
        .map_err(|e| TaskError::Database(e.to_string()))
    }

    fn list_by_state(&self, state: TaskState) -> Result<Vec<TaskView>, TaskError> {
        let conn = self
            .db
            .lock()
            .map_err(|e| TaskError::Database(e.to_string()))?;

        let mut stmt = conn
            .prepare(&Self::view_sql(
                "WHERE t.state = ? ORDER BY t.updated_at DESC, t.id DESC",
            ))
            .map_err(|e| TaskError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![state.as_str()], Self::row_to_view)
            .map_err(|e| TaskError::Database(e.to_string()))?;

        let mut views = Vec::new();
        for row in rows {
            views.push(row.map_err(|e| TaskError::Database(e.to_string()))?);
        }
        Ok(views)
    }

    fn list_for_order(&self, order_id: i64) -> Result<Vec<Task>, TaskError> {
        let conn = self
            .db
            .lock()
            .map_err(|e| TaskError::Database(e.to_string()))?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM tasks t WHERE t.order_id = ? ORDER BY t.id",
                TASK_COLUMNS
            ))
            .map_err(|e| TaskError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![order_id], Self::row_to_task)
            .map_err(|e| TaskError::Database(e.to_string()))?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row.map_err(|e| TaskError::Database(e.to_string()))?);
        }
        Ok(tasks)
    }

    fn count_by_state(&self, state: TaskState) -> Result<i64, TaskError> {
        let conn = self
            .db
            .lock()
            .map_err(|e| TaskError::Database(e.to_string()))?;

        conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE state = ?",
            params![state.as_str()],
            |row| row.get(0),
        )
        .map_err(|e| TaskError::Database(e.to_string()))
    }
}
