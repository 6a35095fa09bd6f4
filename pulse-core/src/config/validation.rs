//! Configuration validation module

use crate::config::{
    EventLogConfig, IdempotencyConfig, LoggingConfig, RateLimitConfig, ServerConfig, StoreConfig,
    TenantsConfig,
};
use crate::infrastructure::tenant_directory::TenantDirectory;

/// Trait for validating configuration sections
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Server configuration error: {message}")]
    Server { message: String },

    #[error("Store configuration error: {message}")]
    Store { message: String },

    #[error("Event log configuration error: {message}")]
    EventLog { message: String },

    #[error("Rate limit configuration error: {message}")]
    RateLimit { message: String },

    #[error("Idempotency configuration error: {message}")]
    Idempotency { message: String },

    #[error("Tenant configuration error: {message}")]
    Tenants { message: String },

    #[error("Logging configuration error: {message}")]
    Logging { message: String },
}

impl ValidationError {
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    pub fn event_log(message: impl Into<String>) -> Self {
        Self::EventLog {
            message: message.into(),
        }
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::RateLimit {
            message: message.into(),
        }
    }

    pub fn idempotency(message: impl Into<String>) -> Self {
        Self::Idempotency {
            message: message.into(),
        }
    }

    pub fn tenants(message: impl Into<String>) -> Self {
        Self::Tenants {
            message: message.into(),
        }
    }

    pub fn logging(message: impl Into<String>) -> Self {
        Self::Logging {
            message: message.into(),
        }
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        // u16 cannot exceed 65535, so we only need to check for 0
        if self.port == 0 {
            return Err(ValidationError::server(format!(
                "Port must be in range 1-65535, got {}",
                self.port
            )));
        }

        if self.host.is_empty() {
            return Err(ValidationError::server("Host cannot be empty"));
        }

        if self.request_timeout_seconds == 0 {
            return Err(ValidationError::server(
                "Request timeout must be greater than 0",
            ));
        }

        if self.max_body_bytes == 0 {
            return Err(ValidationError::server(
                "Maximum body size must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Validate for StoreConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::store("Store URL cannot be empty"));
        }

        if self.command_timeout_ms == 0 {
            return Err(ValidationError::store(
                "Command timeout must be greater than 0",
            ));
        }

        if self.cleanup_interval_seconds == 0 {
            return Err(ValidationError::store(
                "Cleanup interval must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Validate for EventLogConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.brokers.is_empty() || self.brokers.iter().any(|b| b.trim().is_empty()) {
            return Err(ValidationError::event_log(
                "At least one non-empty broker address is required",
            ));
        }

        if self.topic.is_empty() {
            return Err(ValidationError::event_log("Topic cannot be empty"));
        }

        if self.partitions < 1 {
            return Err(ValidationError::event_log(format!(
                "Partition count must be at least 1, got {}",
                self.partitions
            )));
        }

        if self.send_timeout_ms == 0 {
            return Err(ValidationError::event_log(
                "Send timeout must be greater than 0",
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(ValidationError::event_log(
                "Retry max_attempts must be at least 1",
            ));
        }

        if self.retry.backoff_multiplier < 1.0 {
            return Err(ValidationError::event_log(
                "Retry backoff_multiplier must be >= 1.0",
            ));
        }

        Ok(())
    }
}

impl Validate for RateLimitConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if !self.enabled {
            return Ok(());
        }

        if self.requests_per_window == 0 {
            return Err(ValidationError::rate_limit(
                "requests_per_window must be greater than 0",
            ));
        }

        if self.window_seconds == 0 {
            return Err(ValidationError::rate_limit(
                "window_seconds must be greater than 0",
            ));
        }

        if self.key_prefix.is_empty() {
            return Err(ValidationError::rate_limit("key_prefix cannot be empty"));
        }

        Ok(())
    }
}

impl Validate for IdempotencyConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if !self.enabled {
            return Ok(());
        }

        if self.ttl_seconds == 0 {
            return Err(ValidationError::idempotency(
                "ttl_seconds must be greater than 0",
            ));
        }

        if self.key_prefix.is_empty() {
            return Err(ValidationError::idempotency("key_prefix cannot be empty"));
        }

        Ok(())
    }
}

impl Validate for TenantsConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        TenantDirectory::parse(&self.api_keys)
            .map(|_| ())
            .map_err(|e| ValidationError::tenants(e.to_string()))
    }
}

impl Validate for LoggingConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        match self.format.as_str() {
            "json" | "pretty" => Ok(()),
            other => Err(ValidationError::logging(format!(
                "Unknown log format '{}', expected 'json' or 'pretty'",
                other
            ))),
        }
    }
}
