use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::middleware::{auth_middleware, metrics_middleware};
use super::{catalog, handlers, orders, push, queue, tasks, webhook, worker};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Automation worker (bearer token)
    let worker_routes = Router::new()
        .route("/queue/next", get(queue::next_task))
        .route("/queue/{task_id}/update", post(queue::update_task))
        .route("/worker/heartbeat", post(worker::heartbeat))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Order source (HMAC signed)
        .route("/webhook/order-created", post(webhook::order_created))
        // Dashboard
        .route("/status", get(worker::get_status))
        .route("/push/subscribe", post(push::subscribe))
        .route("/orders", get(orders::list_orders))
        .route("/orders/{id}", get(orders::get_order))
        .route("/tasks/verification-required", get(tasks::verification_required))
        .route("/tasks/needs-mapping", get(tasks::needs_mapping))
        .route("/catalog", get(catalog::list_catalog))
        .route("/catalog/import", post(catalog::import_catalog))
        .merge(worker_routes)
        .with_state(state.clone());

    Router::new()
        .nest("/api", api_routes)
        .route("/metrics", get(handlers::metrics).with_state(state))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
