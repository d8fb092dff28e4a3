use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fulfillment_core::{
    build_notifiers, create_authenticator, create_notification_system, load_config,
    validate_config, Authenticator, Database, PushTokenStore, SqlitePushTokenStore,
};
use fulfillment_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How long to wait for queued notifications on shutdown.
const NOTIFICATION_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("FULFILLMENT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    // Fingerprint of the effective config, handy when comparing deployments
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        version = VERSION,
        config_hash = &config_hash[..16],
        "Configuration loaded"
    );
    info!("Auth method: {}", config.auth.method.as_str());
    info!("Database path: {:?}", config.database.path);

    if config
        .webhook
        .shared_secret
        .as_deref()
        .is_none_or(str::is_empty)
    {
        warn!("No webhook shared secret configured; order webhooks will not be verified");
    }

    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    let db = Database::open(&config.database.path).context("Failed to open database")?;
    info!("Database initialized");

    // Notification channels, fed by one dispatcher task
    let push_tokens: Arc<dyn PushTokenStore> = Arc::new(SqlitePushTokenStore::new(db.clone()));
    let notifiers = build_notifiers(&config.notifications, push_tokens);
    info!(
        channels = ?notifiers.iter().map(|n| n.channel()).collect::<Vec<_>>(),
        "Notification channels ready"
    );
    let (notifications, dispatcher) =
        create_notification_system(notifiers, config.notifications.buffer_size);
    let dispatcher_handle = tokio::spawn(dispatcher.run());

    let addr = SocketAddr::new(config.server.host, config.server.port);

    let state = Arc::new(AppState::new(
        config,
        authenticator,
        db,
        notifications,
    ));
    let app = create_router(state);

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    // The router (and every notification handle it held) is gone by now,
    // so the dispatcher stops once the channel is drained.
    info!("Flushing pending notifications...");
    match tokio::time::timeout(NOTIFICATION_DRAIN_TIMEOUT, dispatcher_handle).await {
        Ok(_) => info!("Notifications flushed"),
        Err(_) => warn!("Timed out waiting for pending notifications"),
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
