//! Event log publishing

mod kafka;

pub use kafka::KafkaEventPublisher;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::PublishedEnvelope;

/// Where the log stored an accepted record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishReceipt {
    pub partition: i32,
    pub offset: i64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("Failed to encode envelope: {0}")]
    Serialization(String),

    #[error("Broker connection error: {0}")]
    Connection(String),

    #[error("Broker rejected record: {0}")]
    Broker(String),

    #[error("Produce timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },
}

impl PublishError {
    /// Transport failures are retried; a record that cannot be encoded never will be.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, PublishError::Serialization(_))
    }
}

/// Durable append-only log the gateway hands accepted events to.
///
/// Implementations return only after the log acknowledged the record, and
/// retry transient failures internally before giving up.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, envelope: &PublishedEnvelope) -> Result<PublishReceipt, PublishError>;
}
