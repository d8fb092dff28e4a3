//! Order ingestion integration tests.
//!
//! These tests drive the ingestor against a file-backed database:
//! - The example order (one catalogued item, one without SKU)
//! - Idempotent replay of the same payload
//! - Full rollback when a storage fault hits mid-order

use std::sync::Arc;

use tempfile::TempDir;

use fulfillment_core::{
    create_notification_system,
    notify::NotificationDispatcher,
    testing::{fixtures, RecordingNotifier},
    Database, IngestError, IngestStatus, NotificationKind, Notifier, OrderIngestor,
    OrderPayload, OrderStore, ProductCatalog, SqliteOrderStore, SqliteProductCatalog,
    SqliteTaskStore, TaskState, TaskStore,
};

struct TestHarness {
    db: Database,
    ingestor: OrderIngestor,
    orders: Arc<SqliteOrderStore>,
    tasks: SqliteTaskStore,
    recorder: Arc<RecordingNotifier>,
    dispatcher: NotificationDispatcher,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db = Database::open(&temp_dir.path().join("fulfillment.db"))
            .expect("Failed to open database");

        let catalog = Arc::new(SqliteProductCatalog::new(db.clone()));
        catalog
            .import(&fixtures::example_catalog())
            .expect("Failed to seed catalog");

        let recorder = Arc::new(RecordingNotifier::new());
        let notifiers: Vec<Arc<dyn Notifier>> = vec![recorder.clone()];
        let (handle, dispatcher) = create_notification_system(notifiers, 64);

        let orders = Arc::new(SqliteOrderStore::new(db.clone()));
        Self {
            ingestor: OrderIngestor::new(orders.clone(), catalog, handle),
            tasks: SqliteTaskStore::new(db.clone()),
            orders,
            db,
            recorder,
            dispatcher,
            _temp_dir: temp_dir,
        }
    }

    fn count(&self, table: &str) -> i64 {
        self.db
            .lock()
            .unwrap()
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })
            .unwrap()
    }

    /// Stop emitting and deliver everything still queued.
    async fn drain_notifications(self) -> Arc<RecordingNotifier> {
        let TestHarness {
            ingestor,
            dispatcher,
            recorder,
            ..
        } = self;
        drop(ingestor);
        dispatcher.run().await;
        recorder
    }
}

#[tokio::test]
async fn test_example_order_scenario() {
    let harness = TestHarness::new();

    let result = harness
        .ingestor
        .ingest(&fixtures::example_order_payload())
        .unwrap();
    assert_eq!(result.status, IngestStatus::Success);
    assert_eq!(result.tasks_created, 1);
    assert_eq!(result.needs_mapping, 1);

    assert_eq!(harness.count("orders"), 1);
    assert_eq!(harness.count("line_items"), 2);
    assert_eq!(harness.count("tasks"), 2);

    let order = &harness.orders.list_recent(10).unwrap()[0];
    let tasks = harness.tasks.list_for_order(order.order.id).unwrap();

    let queued = &tasks[0];
    assert_eq!(queued.unique_key, "E-1001:1");
    assert_eq!(queued.state, TaskState::Queued);
    assert_eq!(queued.asin.as_deref(), Some("B000ABC123"));
    assert_eq!(queued.amazon_url.as_deref(), Some(fixtures::EXAMPLE_URL));

    let unmapped = &tasks[1];
    assert_eq!(unmapped.unique_key, "E-1001:2");
    assert_eq!(unmapped.state, TaskState::NeedsMapping);
    assert_eq!(unmapped.error_message.as_deref(), Some("no identifier provided"));

    let recorder = harness.drain_notifications().await;
    assert_eq!(
        recorder.kinds(),
        vec![NotificationKind::NewOrder, NotificationKind::NeedsMapping]
    );
    assert_eq!(recorder.notifications()[0].body, "Order #1001 - 2 item(s)");
    assert!(recorder.notifications()[1]
        .long_text()
        .contains("Gift Wrap (no SKU)"));
}

#[tokio::test]
async fn test_replay_creates_nothing_new() {
    let harness = TestHarness::new();
    let payload = fixtures::example_order_payload();

    let first = harness.ingestor.ingest(&payload).unwrap();
    let order_id = harness.orders.list_recent(10).unwrap()[0].order.id;
    let tasks_before = harness.tasks.list_for_order(order_id).unwrap();

    let second = harness.ingestor.ingest(&payload).unwrap();

    assert_eq!(second.status, IngestStatus::AlreadyProcessed);
    assert_eq!(
        (second.tasks_created, second.needs_mapping),
        (first.tasks_created, first.needs_mapping)
    );
    assert_eq!(harness.count("orders"), 1);
    assert_eq!(harness.count("line_items"), 2);
    assert_eq!(harness.tasks.list_for_order(order_id).unwrap(), tasks_before);

    let recorder = harness.drain_notifications().await;
    assert_eq!(recorder.kinds().len(), 2);
}

#[tokio::test]
async fn test_replay_counts_survive_worker_progress() {
    let harness = TestHarness::new();
    let payload = fixtures::example_order_payload();
    harness.ingestor.ingest(&payload).unwrap();

    let leased = harness.tasks.lease_next().unwrap().unwrap();
    harness
        .tasks
        .report_state(
            leased.task.id,
            &fulfillment_core::StateReport::new(TaskState::Purchased),
        )
        .unwrap();

    let replay = harness.ingestor.ingest(&payload).unwrap();
    assert_eq!(replay.tasks_created, 1);
    assert_eq!(replay.needs_mapping, 1);
}

#[tokio::test]
async fn test_storage_fault_rolls_back_whole_order() {
    let harness = TestHarness::new();
    harness
        .db
        .lock()
        .unwrap()
        .execute_batch(
            r#"
            CREATE TRIGGER fail_third_line_item BEFORE INSERT ON line_items
            WHEN (SELECT COUNT(*) FROM line_items WHERE order_id = NEW.order_id) >= 2
            BEGIN
                SELECT RAISE(ABORT, 'simulated storage fault');
            END;
            "#,
        )
        .unwrap();

    let payload: OrderPayload =
        serde_json::from_value(fixtures::order_json("E-5005", 5)).unwrap();

    let result = harness.ingestor.ingest(&payload);
    assert!(matches!(result, Err(IngestError::Order(_))));
    assert_eq!(harness.count("orders"), 0);
    assert_eq!(harness.count("line_items"), 0);
    assert_eq!(harness.count("tasks"), 0);

    harness
        .db
        .lock()
        .unwrap()
        .execute_batch("DROP TRIGGER fail_third_line_item;")
        .unwrap();

    let retry = harness.ingestor.ingest(&payload).unwrap();
    assert_eq!(retry.status, IngestStatus::Success);
    assert_eq!(retry.tasks_created, 5);
    assert_eq!(harness.count("tasks"), 5);

    let recorder = harness.drain_notifications().await;
    assert_eq!(recorder.kinds(), vec![NotificationKind::NewOrder]);
}

#[tokio::test]
async fn test_catalog_edits_apply_to_next_order() {
    let harness = TestHarness::new();
    let catalog = SqliteProductCatalog::new(harness.db.clone());

    let payload: OrderPayload = serde_json::from_value(serde_json::json!({
        "id": "E-7",
        "line_items": [{"id": 1, "title": "Lamp", "sku": "B00LAMP001"}]
    }))
    .unwrap();
    assert_eq!(harness.ingestor.ingest(&payload).unwrap().needs_mapping, 1);

    catalog
        .import(&[fulfillment_core::ProductImport::new(
            "B00LAMP001",
            "B00LAMP001",
            "https://www.amazon.com/dp/B00LAMP001",
        )])
        .unwrap();

    let next: OrderPayload = serde_json::from_value(serde_json::json!({
        "id": "E-8",
        "line_items": [{"id": 1, "title": "Lamp", "sku": "B00LAMP001"}]
    }))
    .unwrap();
    let result = harness.ingestor.ingest(&next).unwrap();
    assert_eq!(result.tasks_created, 1);
    assert_eq!(result.needs_mapping, 0);
}
