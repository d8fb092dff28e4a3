use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Authentication for the worker-facing routes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Shared secret the automation worker sends as `Authorization: Bearer <token>`.
    #[serde(default)]
    pub worker_token: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    Bearer,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::None => "none",
            AuthMethod::Bearer => "bearer",
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("fulfillment.db")
}

/// Order webhook configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WebhookConfig {
    /// HMAC secret shared with the order source. Empty or absent disables verification.
    #[serde(default)]
    pub shared_secret: Option<String>,
}

/// Worker liveness configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Seconds without a heartbeat after which the worker counts as offline.
    #[serde(default = "default_offline_threshold")]
    pub offline_threshold_secs: u64,
    /// Minimum seconds between two offline alerts.
    #[serde(default = "default_offline_alert_interval")]
    pub offline_alert_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            offline_threshold_secs: default_offline_threshold(),
            offline_alert_interval_secs: default_offline_alert_interval(),
        }
    }
}

fn default_offline_threshold() -> u64 {
    120
}

fn default_offline_alert_interval() -> u64 {
    3600
}

/// Outbound notification channels
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationsConfig {
    /// Capacity of the in-process dispatch channel.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    #[serde(default)]
    pub push: Option<PushConfig>,
    #[serde(default)]
    pub email: Option<EmailConfig>,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            push: None,
            email: None,
        }
    }
}

fn default_buffer_size() -> usize {
    256
}

/// Push gateway configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PushConfig {
    /// Gateway send endpoint (e.g., "https://fcm.googleapis.com/fcm/send")
    pub endpoint: String,
    /// Server key sent as `Authorization: key=<server_key>`
    pub server_key: String,
    /// Request timeout in seconds (default: 10)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// HTTP mail relay configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    /// Relay send endpoint
    pub endpoint: String,
    /// Relay API key sent as a bearer token
    pub api_key: String,
    pub sender: String,
    pub recipient: String,
    /// Request timeout in seconds (default: 10)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    10
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub webhook: SanitizedWebhookConfig,
    pub worker: WorkerConfig,
    pub notifications: SanitizedNotificationsConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
    pub worker_token_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedWebhookConfig {
    pub shared_secret_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedNotificationsConfig {
    pub buffer_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push: Option<SanitizedPushConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<SanitizedEmailConfig>,
}

/// Sanitized push config (server key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedPushConfig {
    pub endpoint: String,
    pub server_key_configured: bool,
    pub timeout_secs: u64,
}

/// Sanitized email config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedEmailConfig {
    pub endpoint: String,
    pub api_key_configured: bool,
    pub sender: String,
    pub recipient: String,
    pub timeout_secs: u64,
}

fn is_set(secret: &Option<String>) -> bool {
    secret.as_deref().is_some_and(|s| !s.is_empty())
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: config.auth.method.as_str().to_string(),
                worker_token_configured: is_set(&config.auth.worker_token),
            },
            server: config.server.clone(),
            database: config.database.clone(),
            webhook: SanitizedWebhookConfig {
                shared_secret_configured: is_set(&config.webhook.shared_secret),
            },
            worker: config.worker.clone(),
            notifications: SanitizedNotificationsConfig {
                buffer_size: config.notifications.buffer_size,
                push: config.notifications.push.as_ref().map(|p| SanitizedPushConfig {
                    endpoint: p.endpoint.clone(),
                    server_key_configured: !p.server_key.is_empty(),
                    timeout_secs: p.timeout_secs,
                }),
                email: config
                    .notifications
                    .email
                    .as_ref()
                    .map(|e| SanitizedEmailConfig {
                        endpoint: e.endpoint.clone(),
                        api_key_configured: !e.api_key.is_empty(),
                        sender: e.sender.clone(),
                        recipient: e.recipient.clone(),
                        timeout_secs: e.timeout_secs,
                    }),
            },
        }
    }
}
