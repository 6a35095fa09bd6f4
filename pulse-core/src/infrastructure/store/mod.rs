//! Admission Store Backends
//!
//! Idempotency records and rate counters live in a key-value store with two
//! atomic primitives, so that every gateway instance sees the same state:
//! - `SET key 1 NX EX ttl` for claims
//! - `INCR key` followed by `EXPIRE key window` on the first increment
//!
//! Backends:
//! - Dragonfly/Redis for distributed, production use
//! - In-memory for development, single-instance deployments and tests

mod dragonfly;
mod memory;

pub use dragonfly::DragonflyAdmissionStore;
pub use memory::InMemoryAdmissionStore;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Failure talking to the backing store. Callers in the admission path treat
/// every variant as "store unavailable" and fail open.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store connection error: {0}")]
    Connection(String),

    #[error("Store {command} error: {message}")]
    Command {
        command: &'static str,
        message: String,
    },

    #[error("Store {command} timed out after {after_ms}ms")]
    Timeout { command: &'static str, after_ms: u64 },
}

/// Trait for admission store backends
#[async_trait]
pub trait AdmissionStore: Send + Sync {
    /// Atomically create `key` with expiry `ttl` if it does not exist.
    ///
    /// Returns `true` when this call created the key.
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Atomically increment the counter at `key` and return the new value.
    /// When the new value is 1 the key is given expiry `window`.
    async fn increment(&self, key: &str, window: Duration) -> Result<u64, StoreError>;

    /// Delete a key
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Reachability probe used by the health endpoint
    async fn ping(&self) -> Result<(), StoreError>;

    /// Cleanup expired entries (for in-memory storage)
    async fn cleanup(&self);
}
