pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod order;
pub mod queue;
pub mod task;
pub mod testing;
pub mod worker;

pub use auth::{
    create_authenticator, AuthError, AuthRequest, Authenticator, BearerTokenAuthenticator,
    Identity, NoneAuthenticator, SignatureError, WebhookVerifier, SIGNATURE_HEADER,
};
pub use catalog::{
    CatalogError, CatalogSnapshot, ImportSummary, Product, ProductCatalog, ProductImport,
    SqliteProductCatalog,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
    SanitizedConfig,
};
pub use db::{Database, DatabaseError};
pub use ingest::{IngestError, IngestResult, IngestStatus, OrderIngestor};
pub use notify::{
    build_notifiers, create_notification_system, Notification, NotificationDispatcher,
    NotificationHandle, NotificationKind, Notifier, NotifyError, PushTokenStore,
    SqlitePushTokenStore,
};
pub use order::{
    OrderDetail, OrderError, OrderPayload, OrderStore, OrderSummary, SqliteOrderStore,
    RECENT_ORDERS_LIMIT,
};
pub use queue::TaskQueue;
pub use task::{
    LeasedTask, SqliteTaskStore, StateReport, Task, TaskError, TaskState, TaskStore, TaskView,
};
pub use worker::{
    LivenessMonitor, LivenessPolicy, SqliteWorkerStatusStore, StatusReport, WorkerError,
    WorkerStatusStore,
};
