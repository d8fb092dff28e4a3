//! Common test utilities for server integration tests.
//!
//! Provides a `TestFixture` that runs the full router in-process against a
//! temporary database, with a recording notification channel.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use fulfillment_core::{
    config::{
        AuthConfig, DatabaseConfig, NotificationsConfig, ServerConfig, WebhookConfig,
        WorkerConfig,
    },
    create_notification_system,
    testing::{sign_webhook_body, RecordingNotifier},
    AuthMethod, Authenticator, BearerTokenAuthenticator, Config, Database, NotificationKind,
    Notifier, ProductCatalog, ProductImport, SqliteProductCatalog, SIGNATURE_HEADER,
};

pub use fulfillment_core::testing::fixtures;

/// Token the fixture's worker authenticates with.
pub const WORKER_TOKEN: &str = "worker-secret";

/// Secret the fixture's order source signs webhooks with.
pub const WEBHOOK_SECRET: &str = "webhook-secret";

/// Test fixture that holds the server state and the recording channel.
pub struct TestFixture {
    pub router: Router,
    pub recorder: Arc<RecordingNotifier>,
    pub db: Database,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Fixture with the example catalog loaded.
    pub async fn new() -> Self {
        let fixture = Self::empty().await;
        SqliteProductCatalog::new(fixture.db.clone())
            .import(&fixtures::example_catalog())
            .expect("Failed to seed catalog");
        fixture
    }

    /// Fixture with an empty catalog.
    pub async fn empty() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            auth: AuthConfig {
                method: AuthMethod::Bearer,
                worker_token: Some(WORKER_TOKEN.to_string()),
            },
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            webhook: WebhookConfig {
                shared_secret: Some(WEBHOOK_SECRET.to_string()),
            },
            worker: WorkerConfig::default(),
            notifications: NotificationsConfig::default(),
        };

        let db = Database::open(&db_path).expect("Failed to open database");

        let recorder = Arc::new(RecordingNotifier::new());
        let notifiers: Vec<Arc<dyn Notifier>> = vec![recorder.clone()];
        let (handle, dispatcher) = create_notification_system(notifiers, 64);
        tokio::spawn(dispatcher.run());

        let authenticator: Arc<dyn Authenticator> =
            Arc::new(BearerTokenAuthenticator::new(WORKER_TOKEN.to_string()));

        let state = Arc::new(fulfillment_server::state::AppState::new(
            config,
            authenticator,
            db.clone(),
            handle,
        ));
        let router = fulfillment_server::api::create_router(state);

        Self {
            router,
            recorder,
            db,
            temp_dir,
        }
    }

    /// Add products to the catalog.
    pub fn import(&self, products: &[ProductImport]) {
        SqliteProductCatalog::new(self.db.clone())
            .import(products)
            .expect("Failed to import products");
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(Request::builder().method("GET").uri(path), Body::empty())
            .await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.send(
            Request::builder()
                .method("POST")
                .uri(path)
                .header("Content-Type", "application/json"),
            Body::from(serde_json::to_vec(&body).unwrap()),
        )
        .await
    }

    /// Send a GET request as the authenticated worker.
    pub async fn worker_get(&self, path: &str) -> TestResponse {
        self.send(
            Request::builder()
                .method("GET")
                .uri(path)
                .header("Authorization", format!("Bearer {}", WORKER_TOKEN)),
            Body::empty(),
        )
        .await
    }

    /// Send a JSON POST request as the authenticated worker.
    pub async fn worker_post(&self, path: &str, body: Value) -> TestResponse {
        self.send(
            Request::builder()
                .method("POST")
                .uri(path)
                .header("Content-Type", "application/json")
                .header("Authorization", format!("Bearer {}", WORKER_TOKEN)),
            Body::from(serde_json::to_vec(&body).unwrap()),
        )
        .await
    }

    /// Send a raw POST as the authenticated worker, with an optional content type.
    pub async fn worker_post_raw(
        &self,
        path: &str,
        body: &str,
        content_type: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header("Authorization", format!("Bearer {}", WORKER_TOKEN));
        if let Some(content_type) = content_type {
            builder = builder.header("Content-Type", content_type);
        }
        self.send(builder, Body::from(body.to_string())).await
    }

    /// Deliver an order webhook signed with the fixture's secret.
    pub async fn deliver_order(&self, order: &Value) -> TestResponse {
        let body = serde_json::to_vec(order).unwrap();
        let signature = sign_webhook_body(WEBHOOK_SECRET, &body);
        self.post_webhook(body, Some(&signature)).await
    }

    /// Deliver raw webhook bytes with an arbitrary signature header.
    pub async fn post_webhook(&self, body: Vec<u8>, signature: Option<&str>) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/webhook/order-created")
            .header("Content-Type", "application/json");
        if let Some(signature) = signature {
            builder = builder.header(SIGNATURE_HEADER, signature);
        }
        self.send(builder, Body::from(body)).await
    }

    /// Send a request and return the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn send(&self, builder: axum::http::request::Builder, body: Body) -> TestResponse {
        let request = builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }

    /// Wait until `count` notifications have been delivered, then return their kinds.
    pub async fn wait_for_notifications(&self, count: usize) -> Vec<NotificationKind> {
        for _ in 0..100 {
            if self.recorder.notifications().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.recorder.kinds()
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
