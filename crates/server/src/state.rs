use std::sync::Arc;

use fulfillment_core::{
    Authenticator, Config, Database, LivenessMonitor, LivenessPolicy, NotificationHandle,
    OrderIngestor, OrderStore, ProductCatalog, PushTokenStore, SanitizedConfig, SqliteOrderStore,
    SqliteProductCatalog, SqlitePushTokenStore, SqliteTaskStore, SqliteWorkerStatusStore,
    TaskQueue, TaskStore, WebhookVerifier,
};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    verifier: WebhookVerifier,
    ingestor: OrderIngestor,
    queue: TaskQueue,
    monitor: LivenessMonitor,
    orders: Arc<dyn OrderStore>,
    tasks: Arc<dyn TaskStore>,
    catalog: Arc<dyn ProductCatalog>,
    push_tokens: Arc<dyn PushTokenStore>,
}

impl AppState {
    /// Wire every store onto `db` and hand each service a clone of `notifications`.
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        db: Database,
        notifications: NotificationHandle,
    ) -> Self {
        let orders: Arc<dyn OrderStore> = Arc::new(SqliteOrderStore::new(db.clone()));
        let tasks: Arc<dyn TaskStore> = Arc::new(SqliteTaskStore::new(db.clone()));
        let catalog: Arc<dyn ProductCatalog> = Arc::new(SqliteProductCatalog::new(db.clone()));
        let push_tokens: Arc<dyn PushTokenStore> = Arc::new(SqlitePushTokenStore::new(db.clone()));

        let verifier = WebhookVerifier::new(config.webhook.shared_secret.as_deref());
        let ingestor = OrderIngestor::new(orders.clone(), catalog.clone(), notifications.clone());
        let queue = TaskQueue::new(tasks.clone(), notifications.clone());
        let monitor = LivenessMonitor::new(
            Arc::new(SqliteWorkerStatusStore::new(db)),
            tasks.clone(),
            notifications,
            LivenessPolicy::from(&config.worker),
        );

        Self {
            config,
            authenticator,
            verifier,
            ingestor,
            queue,
            monitor,
            orders,
            tasks,
            catalog,
            push_tokens,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn verifier(&self) -> &WebhookVerifier {
        &self.verifier
    }

    pub fn ingestor(&self) -> &OrderIngestor {
        &self.ingestor
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub fn monitor(&self) -> &LivenessMonitor {
        &self.monitor
    }

    pub fn orders(&self) -> &dyn OrderStore {
        self.orders.as_ref()
    }

    pub fn tasks(&self) -> &dyn TaskStore {
        self.tasks.as_ref()
    }

    pub fn catalog(&self) -> &dyn ProductCatalog {
        self.catalog.as_ref()
    }

    pub fn push_tokens(&self) -> &dyn PushTokenStore {
        self.push_tokens.as_ref()
    }
}
