//! Shared mock implementations for testing

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use pulse_core::domain::PublishedEnvelope;
use pulse_core::infrastructure::publisher::{EventPublisher, PublishError, PublishReceipt};
use pulse_core::infrastructure::store::{AdmissionStore, InMemoryAdmissionStore, StoreError};

/// Publisher that records every envelope it accepts.
///
/// The first `fail_first` publishes are rejected, which lets a test fail one
/// request and succeed on its retry.
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<PublishedEnvelope>>,
    attempts: AtomicUsize,
    fail_first: usize,
    delay: Option<Duration>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every publish
    pub fn failing() -> Self {
        Self::failing_first(usize::MAX)
    }

    pub fn failing_first(count: usize) -> Self {
        Self {
            fail_first: count,
            ..Self::default()
        }
    }

    /// Hold each publish open for `delay`, widening race windows
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn published(&self) -> Vec<PublishedEnvelope> {
        self.published.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, envelope: &PublishedEnvelope) -> Result<PublishReceipt, PublishError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if attempt < self.fail_first {
            return Err(PublishError::Broker("mock broker unavailable".to_string()));
        }

        let mut published = self.published.lock().unwrap();
        published.push(envelope.clone());
        Ok(PublishReceipt {
            partition: 0,
            offset: published.len() as i64 - 1,
        })
    }
}

/// Store whose every command fails, as if Dragonfly were unreachable
pub struct UnavailableStore;

#[async_trait]
impl AdmissionStore for UnavailableStore {
    async fn set_if_absent(&self, _key: &str, _ttl: Duration) -> Result<bool, StoreError> {
        Err(StoreError::Connection("connection refused".to_string()))
    }

    async fn increment(&self, _key: &str, _window: Duration) -> Result<u64, StoreError> {
        Err(StoreError::Connection("connection refused".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Connection("connection refused".to_string()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Connection("connection refused".to_string()))
    }

    async fn cleanup(&self) {}
}

/// In-memory store that counts the commands it receives
#[derive(Default)]
pub struct CountingStore {
    inner: InMemoryAdmissionStore,
    set_if_absent_calls: AtomicUsize,
    increment_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_if_absent_calls(&self) -> usize {
        self.set_if_absent_calls.load(Ordering::SeqCst)
    }

    pub fn increment_calls(&self) -> usize {
        self.increment_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.set_if_absent_calls() + self.increment_calls() + self.delete_calls()
    }

    pub async fn get(&self, key: &str) -> Option<u64> {
        self.inner.get(key).await
    }
}

#[async_trait]
impl AdmissionStore for CountingStore {
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        self.set_if_absent_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.set_if_absent(key, ttl).await
    }

    async fn increment(&self, key: &str, window: Duration) -> Result<u64, StoreError> {
        self.increment_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.increment(key, window).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(key).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }

    async fn cleanup(&self) {
        self.inner.cleanup().await
    }
}
