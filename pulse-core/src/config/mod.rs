//! Configuration management

pub mod validation;

pub use validation::{Validate, ValidationError};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry configuration (serializable version)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfigSerializable {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Initial delay between retries (in milliseconds)
    pub initial_delay_ms: u64,
    /// Maximum delay between retries (in milliseconds)
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfigSerializable {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 2000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfigSerializable {
    /// Convert to the runtime RetryConfig
    pub fn to_retry_config(&self) -> crate::infrastructure::resilience::RetryConfig {
        crate::infrastructure::resilience::RetryConfig {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
        }
    }
}

/// SET NX, INCR, EXPIRE and DEL
const STORE_COMMANDS_PER_REQUEST: u32 = 4;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub event_log: EventLogConfig,
    pub rate_limit: RateLimitConfig,
    pub idempotency: IdempotencyConfig,
    pub tenants: TenantsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on a single request, from first byte read to response written.
    pub request_timeout_seconds: u64,
    /// How long in-flight requests may run after a shutdown signal before the
    /// process stops waiting for them.
    pub shutdown_grace_seconds: u64,
    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_seconds: 20,
            shutdown_grace_seconds: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Backend for idempotency records and rate counters
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Dragonfly/Redis, shared across gateway instances (recommended for production)
    #[default]
    Dragonfly,
    /// Process-local memory (development/single instance only)
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Timeout for connecting and for each individual store command
    pub command_timeout_ms: u64,
    /// Purge interval for expired entries (in-memory backend only)
    pub cleanup_interval_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Dragonfly,
            url: "redis://127.0.0.1:6379".to_string(),
            command_timeout_ms: 500,
            cleanup_interval_seconds: 60,
        }
    }
}

impl StoreConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventLogConfig {
    /// Bootstrap brokers, `host:port`
    pub brokers: Vec<String>,
    /// Topic every accepted event is published to
    pub topic: String,
    /// Number of partitions of `topic`; records are spread round-robin
    pub partitions: i32,
    /// Timeout for a single produce attempt (in milliseconds)
    pub send_timeout_ms: u64,
    pub retry: RetryConfigSerializable,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            brokers: vec!["localhost:9092".to_string()],
            topic: "events.raw".to_string(),
            partitions: 1,
            send_timeout_ms: 5000,
            retry: RetryConfigSerializable::default(),
        }
    }
}

impl EventLogConfig {
    /// Longest a single publish can take: every attempt timing out plus the
    /// backoff between attempts
    pub fn publish_budget(&self) -> Duration {
        let retry = self.retry.to_retry_config();
        Duration::from_millis(self.send_timeout_ms) * retry.max_attempts.max(1)
            + retry.total_backoff()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Requests admitted per tenant per window
    pub requests_per_window: u32,
    /// Fixed window width, aligned to the UTC clock
    pub window_seconds: u64,
    pub key_prefix: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_window: 300,
            window_seconds: 60,
            key_prefix: "rl".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdempotencyConfig {
    pub enabled: bool,
    /// Retention window of an idempotency record
    pub ttl_seconds: u64,
    pub key_prefix: String,
    /// Delete the claim when the publish that followed it failed, so that a
    /// retry with the same key is published instead of reported as duplicate.
    pub release_on_publish_failure: bool,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 1800,
            key_prefix: "idem".to_string(),
            release_on_publish_failure: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantsConfig {
    /// Comma separated `tenant_id:api_key` pairs
    pub api_keys: String,
}

impl Default for TenantsConfig {
    fn default() -> Self {
        Self {
            api_keys: "tenant_a:key_a,tenant_b:key_b".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.store.validate()?;
        self.event_log.validate()?;
        self.rate_limit.validate()?;
        self.idempotency.validate()?;
        self.tenants.validate()?;
        self.logging.validate()?;

        let request_timeout = Duration::from_secs(self.server.request_timeout_seconds);
        let budget = self.admission_budget();
        if request_timeout < budget {
            return Err(ValidationError::server(format!(
                "request_timeout_seconds ({}s) must cover the worst-case admission time ({}ms: store commands plus publish retries)",
                self.server.request_timeout_seconds,
                budget.as_millis()
            )));
        }

        Ok(())
    }
}

impl Config {
    /// Worst-case time to admit one request: claim, counter increment and
    /// expiry, publish with retries, and a claim release after a failed
    /// publish
    pub fn admission_budget(&self) -> Duration {
        self.store.command_timeout() * STORE_COMMANDS_PER_REQUEST + self.event_log.publish_budget()
    }

    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigLoadError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        // Add environment-specific config if ENV is set
        if let Ok(env) = std::env::var("ENV") {
            builder = builder
                .add_source(config::File::with_name(&format!("config/{}", env)).required(false));
        }

        // Add local config and environment variables last (highest priority)
        builder = builder
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("PULSE")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("event_log.brokers")
                    .try_parsing(true),
            );

        let config: Config = builder.build()?.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Configuration file error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Validation(#[from] ValidationError),
}
