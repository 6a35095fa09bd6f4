//! In-memory admission store

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use super::{AdmissionStore, StoreError};

/// In-memory storage entry with optional expiration
#[derive(Debug, Clone, Copy)]
struct MemoryEntry {
    value: u64,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// In-memory storage backend for development/single instance.
///
/// One mutex guards the whole map, which gives every operation the same
/// atomicity the Redis primitives have.
#[derive(Default)]
pub struct InMemoryAdmissionStore {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl InMemoryAdmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a live key
    pub async fn get(&self, key: &str) -> Option<u64> {
        let entries = self.entries.lock().await;
        let now = Instant::now();
        entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value)
    }

    /// Number of stored entries, expired ones included until the next cleanup
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl AdmissionStore for InMemoryAdmissionStore {
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        if entries.get(key).is_some_and(|entry| entry.is_live(now)) {
            return Ok(false);
        }

        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: 1,
                expires_at: Some(now + ttl),
            },
        );
        Ok(true)
    }

    async fn increment(&self, key: &str, window: Duration) -> Result<u64, StoreError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let entry = entries
            .entry(key.to_string())
            .and_modify(|entry| {
                if entry.is_live(now) {
                    entry.value += 1;
                } else {
                    *entry = MemoryEntry {
                        value: 1,
                        expires_at: None,
                    };
                }
            })
            .or_insert(MemoryEntry {
                value: 1,
                expires_at: None,
            });

        if entry.value == 1 {
            entry.expires_at = Some(now + window);
        }

        Ok(entry.value)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn cleanup(&self) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));

        debug!(
            purged = before - entries.len(),
            "Completed admission store cleanup"
        );
    }
}
