//! SQLite-backed order store implementation.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Transaction, TransactionBehavior};

use super::{
    IngestOutcome, NewOrder, Order, OrderDetail, OrderError, OrderItem, OrderStore, OrderSummary,
    PlannedLineItem,
};
use crate::db::{format_timestamp, parse_timestamp, Database};
use crate::task::TaskState;

const ORDER_COLUMNS: &str = "o.id, o.shopify_order_id, o.shopify_order_number, o.customer_name, o.customer_email, o.shipping_address, o.total_price, o.created_at, o.updated_at";

const ORDER_COLUMN_COUNT: usize = 9;

/// SQLite-backed order store.
pub struct SqliteOrderStore {
    db: Database,
}

impl SqliteOrderStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn row_to_order(row: &rusqlite::Row) -> rusqlite::Result<Order> {
        let address: String = row.get(5)?;
        let created_at: String = row.get(7)?;
        let updated_at: String = row.get(8)?;

        Ok(Order {
            id: row.get(0)?,
            shopify_order_id: row.get(1)?,
            shopify_order_number: row.get(2)?,
            customer_name: row.get(3)?,
            customer_email: row.get(4)?,
            shipping_address: serde_json::from_str(&address).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
            })?,
            total_price: row.get(6)?,
            created_at: parse_timestamp(7, &created_at)?,
            updated_at: parse_timestamp(8, &updated_at)?,
        })
    }

    fn row_to_summary(row: &rusqlite::Row) -> rusqlite::Result<OrderSummary> {
        Ok(OrderSummary {
            order: Self::row_to_order(row)?,
            total_tasks: row.get(ORDER_COLUMN_COUNT)?,
            completed_tasks: row.get(ORDER_COLUMN_COUNT + 1)?,
            verification_tasks: row.get(ORDER_COLUMN_COUNT + 2)?,
            mapping_tasks: row.get(ORDER_COLUMN_COUNT + 3)?,
            failed_tasks: row.get(ORDER_COLUMN_COUNT + 4)?,
        })
    }

    fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<OrderItem> {
        let state: Option<String> = row.get(8)?;
        let state = state
            .map(|s| {
                s.parse::<TaskState>().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        8,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })
            })
            .transpose()?;

        Ok(OrderItem {
            id: row.get(0)?,
            shopify_line_item_id: row.get(1)?,
            title: row.get(2)?,
            variant_title: row.get(3)?,
            sku: row.get(4)?,
            quantity: row.get(5)?,
            price: row.get(6)?,
            task_id: row.get(7)?,
            state,
            amazon_url: row.get(9)?,
            amazon_order_id: row.get(10)?,
            error_message: row.get(11)?,
            last_action: row.get(12)?,
            task_quantity: row.get(13)?,
        })
    }

    /// Counts of (non-mapping, mapping) tasks already stored for an order.
    fn existing_counts(tx: &Transaction, order_id: i64) -> rusqlite::Result<(usize, usize)> {
        tx.query_row(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN state != 'needs_mapping' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN state = 'needs_mapping' THEN 1 ELSE 0 END), 0)
            FROM tasks WHERE order_id = ?
            "#,
            params![order_id],
            |row| {
                let queued: i64 = row.get(0)?;
                let mapping: i64 = row.get(1)?;
                Ok((queued as usize, mapping as usize))
            },
        )
    }
}

impl OrderStore for SqliteOrderStore {
    fn ingest(
        &self,
        order: &NewOrder,
        items: &[PlannedLineItem],
    ) -> Result<IngestOutcome, OrderError> {
        let mut conn = self
            .db
            .lock()
            .map_err(|e| OrderError::Database(e.to_string()))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| OrderError::Database(e.to_string()))?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM orders WHERE shopify_order_id = ?",
                params![order.shopify_order_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| OrderError::Database(e.to_string()))?;

        if let Some(order_id) = existing {
            let (tasks_created, needs_mapping) = Self::existing_counts(&tx, order_id)
                .map_err(|e| OrderError::Database(e.to_string()))?;
            return Ok(IngestOutcome::AlreadyProcessed {
                order_id,
                tasks_created,
                needs_mapping,
            });
        }

        let now = format_timestamp(&Utc::now());
        tx.execute(
            r#"
            INSERT INTO orders
                (shopify_order_id, shopify_order_number, customer_name, customer_email, shipping_address, total_price, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                order.shopify_order_id,
                order.shopify_order_number,
                order.customer_name,
                order.customer_email,
                order.shipping_address.to_string(),
                order.total_price,
                now,
                now,
            ],
        )
        .map_err(|e| OrderError::Database(e.to_string()))?;
        let order_id = tx.last_insert_rowid();

        let mut tasks_created = 0;
        let mut needs_mapping = Vec::new();

        for item in items {
            let line = &item.line_item;
            tx.execute(
                r#"
                INSERT INTO line_items (order_id, shopify_line_item_id, title, variant_title, sku, quantity, price)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
                params![
                    order_id,
                    line.shopify_line_item_id,
                    line.title,
                    line.variant_title,
                    line.sku,
                    line.quantity,
                    line.price,
                ],
            )
            .map_err(|e| OrderError::Database(e.to_string()))?;
            let line_item_id = tx.last_insert_rowid();

            let taken = tx
                .query_row(
                    "SELECT 1 FROM tasks WHERE unique_key = ?",
                    params![item.task.unique_key],
                    |_| Ok(()),
                )
                .optional()
                .map_err(|e| OrderError::Database(e.to_string()))?
                .is_some();
            if taken {
                tracing::warn!(key = %item.task.unique_key, "Task key already exists, line item recorded without a task");
                continue;
            }

            let task = &item.task;
            tx.execute(
                r#"
                INSERT INTO tasks
                    (unique_key, order_id, line_item_id, asin, amazon_url, quantity, state, error_message, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                params![
                    task.unique_key,
                    order_id,
                    line_item_id,
                    task.asin,
                    task.amazon_url,
                    task.quantity,
                    task.state.as_str(),
                    task.error_message,
                    now,
                    now,
                ],
            )
            .map_err(|e| OrderError::Database(e.to_string()))?;

            if task.state == TaskState::NeedsMapping {
                needs_mapping.push(
                    item.mapping_label
                        .clone()
                        .unwrap_or_else(|| line.title.clone()),
                );
            } else {
                tasks_created += 1;
            }
        }

        tx.commit()
            .map_err(|e| OrderError::Database(e.to_string()))?;

        Ok(IngestOutcome::Created {
            order_id,
            tasks_created,
            needs_mapping,
        })
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<OrderSummary>, OrderError> {
        let conn = self
            .db
            .lock()
            .map_err(|e| OrderError::Database(e.to_string()))?;

        let mut stmt = conn
            .prepare(&format!(
                r#"
                SELECT {},
                    COUNT(t.id),
                    COALESCE(SUM(CASE WHEN t.state = 'purchased' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN t.state = 'verification_required' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN t.state = 'needs_mapping' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN t.state = 'failed' THEN 1 ELSE 0 END), 0)
                FROM orders o
                LEFT JOIN tasks t ON t.order_id = o.id
                GROUP BY o.id
                ORDER BY o.created_at DESC, o.id DESC
                LIMIT ?
                "#,
                ORDER_COLUMNS
            ))
            .map_err(|e| OrderError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![limit as i64], Self::row_to_summary)
            .map_err(|e| OrderError::Database(e.to_string()))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| OrderError::Database(e.to_string()))
    }

    fn get_detail(&self, id: i64) -> Result<Option<OrderDetail>, OrderError> {
        let conn = self
            .db
            .lock()
            .map_err(|e| OrderError::Database(e.to_string()))?;

        let order = conn
            .query_row(
                &format!("SELECT {} FROM orders o WHERE o.id = ?", ORDER_COLUMNS),
                params![id],
                Self::row_to_order,
            )
            .optional()
            .map_err(|e| OrderError::Database(e.to_string()))?;

        let Some(order) = order else {
            return Ok(None);
        };

        let mut stmt = conn
            .prepare(
                r#"
                SELECT li.id, li.shopify_line_item_id, li.title, li.variant_title, li.sku, li.quantity, li.price,
                       t.id, t.state, t.amazon_url, t.amazon_order_id, t.error_message, t.last_action, t.quantity
                FROM line_items li
                LEFT JOIN tasks t ON t.line_item_id = li.id
                WHERE li.order_id = ?
                ORDER BY li.id
                "#,
            )
            .map_err(|e| OrderError::Database(e.to_string()))?;

        let items = stmt
            .query_map(params![id], Self::row_to_item)
            .map_err(|e| OrderError::Database(e.to_string()))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| OrderError::Database(e.to_string()))?;

        Ok(Some(OrderDetail { order, items }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::NewLineItem;
    use crate::task::{NewTask, SqliteTaskStore, TaskStore};
    use serde_json::json;

    fn new_order(external_id: &str) -> NewOrder {
        NewOrder {
            shopify_order_id: external_id.to_string(),
            shopify_order_number: "1001".to_string(),
            customer_name: "Ada Lovelace".to_string(),
            customer_email: "ada@example.com".to_string(),
            shipping_address: json!({"first_name": "Ada", "last_name": "Lovelace", "city": "London"}),
            total_price: 59.97,
        }
    }

    fn planned(key: &str, sku: &str, state: TaskState) -> PlannedLineItem {
        let mapped = state != TaskState::NeedsMapping;
        PlannedLineItem {
            line_item: NewLineItem {
                shopify_line_item_id: Some(key.rsplit(':').next().unwrap_or_default().to_string()),
                title: format!("Item {}", sku),
                variant_title: None,
                sku: Some(sku.to_string()),
                quantity: 1,
                price: 19.99,
            },
            task: NewTask {
                unique_key: key.to_string(),
                asin: Some(sku.to_string()),
                amazon_url: mapped.then(|| format!("https://www.amazon.com/dp/{}", sku)),
                quantity: 1,
                state,
                error_message: (!mapped).then(|| format!("ASIN {} not in catalog", sku)),
            },
            mapping_label: (!mapped).then(|| format!("Item {} (ASIN: {})", sku, sku)),
        }
    }

    fn count(db: &Database, table: &str) -> i64 {
        db.lock()
            .unwrap()
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_ingest_creates_rows() {
        let db = Database::in_memory().unwrap();
        let store = SqliteOrderStore::new(db.clone());

        let outcome = store
            .ingest(
                &new_order("E-1001"),
                &[
                    planned("E-1001:1", "A1", TaskState::Queued),
                    planned("E-1001:2", "ZZ", TaskState::NeedsMapping),
                ],
            )
            .unwrap();

        let IngestOutcome::Created {
            order_id,
            tasks_created,
            needs_mapping,
        } = outcome
        else {
            panic!("expected Created, got {:?}", outcome);
        };
        assert_eq!(tasks_created, 1);
        assert_eq!(needs_mapping, vec!["Item ZZ (ASIN: ZZ)".to_string()]);

        assert_eq!(count(&db, "orders"), 1);
        assert_eq!(count(&db, "line_items"), 2);
        assert_eq!(count(&db, "tasks"), 2);

        let tasks = SqliteTaskStore::new(db).list_for_order(order_id).unwrap();
        assert_eq!(tasks[0].state, TaskState::Queued);
        assert_eq!(tasks[1].state, TaskState::NeedsMapping);
    }

    #[test]
    fn test_ingest_replay_returns_existing_counts() {
        let db = Database::in_memory().unwrap();
        let store = SqliteOrderStore::new(db.clone());
        let items = [
            planned("E-1001:1", "A1", TaskState::Queued),
            planned("E-1001:2", "ZZ", TaskState::NeedsMapping),
        ];

        let first = store.ingest(&new_order("E-1001"), &items).unwrap();
        let second = store.ingest(&new_order("E-1001"), &items).unwrap();

        let IngestOutcome::Created { order_id, .. } = first else {
            panic!("expected Created");
        };
        assert_eq!(
            second,
            IngestOutcome::AlreadyProcessed {
                order_id,
                tasks_created: 1,
                needs_mapping: 1,
            }
        );
        assert_eq!(count(&db, "orders"), 1);
        assert_eq!(count(&db, "line_items"), 2);
        assert_eq!(count(&db, "tasks"), 2);
    }

    #[test]
    fn test_ingest_duplicate_task_key_keeps_line_item() {
        let db = Database::in_memory().unwrap();
        let store = SqliteOrderStore::new(db.clone());

        let outcome = store
            .ingest(
                &new_order("E-2"),
                &[
                    planned("E-2:7", "A1", TaskState::Queued),
                    planned("E-2:7", "A1", TaskState::Queued),
                ],
            )
            .unwrap();

        assert!(matches!(
            outcome,
            IngestOutcome::Created { tasks_created: 1, .. }
        ));
        assert_eq!(count(&db, "line_items"), 2);
        assert_eq!(count(&db, "tasks"), 1);

        let order_id = match outcome {
            IngestOutcome::Created { order_id, .. } => order_id,
            other => panic!("unexpected outcome: {:?}", other),
        };
        let detail = store.get_detail(order_id).unwrap().unwrap();
        assert_eq!(detail.items.len(), 2);
        assert!(detail.items[0].task_id.is_some());
        assert!(detail.items[1].task_id.is_none());
    }

    #[test]
    fn test_ingest_failure_rolls_back_everything() {
        let db = Database::in_memory().unwrap();
        let store = SqliteOrderStore::new(db.clone());

        let mut bad = planned("E-3:2", "A2", TaskState::Queued);
        bad.line_item.quantity = 0;

        let result = store.ingest(
            &new_order("E-3"),
            &[planned("E-3:1", "A1", TaskState::Queued), bad],
        );

        assert!(matches!(result, Err(OrderError::Database(_))));
        assert_eq!(count(&db, "orders"), 0);
        assert_eq!(count(&db, "line_items"), 0);
        assert_eq!(count(&db, "tasks"), 0);
    }

    #[test]
    fn test_list_recent_counts_by_state() {
        let db = Database::in_memory().unwrap();
        let store = SqliteOrderStore::new(db.clone());
        let tasks = SqliteTaskStore::new(db);

        store
            .ingest(
                &new_order("E-1"),
                &[
                    planned("E-1:1", "A1", TaskState::Queued),
                    planned("E-1:2", "A2", TaskState::Queued),
                    planned("E-1:3", "ZZ", TaskState::NeedsMapping),
                ],
            )
            .unwrap();
        store
            .ingest(&new_order("E-2"), &[planned("E-2:1", "A1", TaskState::Queued)])
            .unwrap();

        let leased = tasks.lease_next().unwrap().unwrap();
        tasks
            .report_state(
                leased.task.id,
                &crate::task::StateReport::new(TaskState::Purchased).with_amazon_order_id("114-1"),
            )
            .unwrap();

        let orders = store.list_recent(100).unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].order.shopify_order_id, "E-2");

        let first = &orders[1];
        assert_eq!(first.order.shopify_order_id, "E-1");
        assert_eq!(first.total_tasks, 3);
        assert_eq!(first.completed_tasks, 1);
        assert_eq!(first.mapping_tasks, 1);
        assert_eq!(first.failed_tasks, 0);

        assert_eq!(store.list_recent(1).unwrap().len(), 1);
    }

    #[test]
    fn test_get_detail_joins_tasks() {
        let db = Database::in_memory().unwrap();
        let store = SqliteOrderStore::new(db);

        let IngestOutcome::Created { order_id, .. } = store
            .ingest(
                &new_order("E-1001"),
                &[
                    planned("E-1001:1", "A1", TaskState::Queued),
                    planned("E-1001:2", "ZZ", TaskState::NeedsMapping),
                ],
            )
            .unwrap()
        else {
            panic!("expected Created");
        };

        let detail = store.get_detail(order_id).unwrap().unwrap();
        assert_eq!(detail.order.customer_name, "Ada Lovelace");
        assert_eq!(detail.order.shipping_address["city"], "London");
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.items[0].state, Some(TaskState::Queued));
        assert_eq!(
            detail.items[0].amazon_url.as_deref(),
            Some("https://www.amazon.com/dp/A1")
        );
        assert_eq!(detail.items[1].state, Some(TaskState::NeedsMapping));
        assert_eq!(
            detail.items[1].error_message.as_deref(),
            Some("ASIN ZZ not in catalog")
        );
    }

    #[test]
    fn test_get_detail_missing() {
        let store = SqliteOrderStore::new(Database::in_memory().unwrap());
        assert!(store.get_detail(42).unwrap().is_none());
    }
}
