//! Common test utilities for pulse-gateway
#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pulse_core::Config;
use pulse_core::application::AdmissionPipeline;
use pulse_core::domain::PublishedEnvelope;
use pulse_core::infrastructure::publisher::{EventPublisher, PublishError, PublishReceipt};
use pulse_core::infrastructure::store::{AdmissionStore, InMemoryAdmissionStore, StoreError};
use pulse_core::infrastructure::tenant_directory::TenantDirectory;
use pulse_gateway::{GatewayState, create_router};

pub const VALID_EVENT: &str = r#"{"event_id":"e1","event_type":"click","schema_version":1,"occurred_at":"2024-01-01T00:00:00Z","payload":{"k":"v"}}"#;

#[derive(Default)]
pub struct MockPublisher {
    published: Mutex<Vec<PublishedEnvelope>>,
    attempts: AtomicUsize,
    fail: bool,
    first_call_delay: Option<Duration>,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// The first publish call takes `delay` before answering
    pub fn slow_first_call(delay: Duration, fail: bool) -> Self {
        Self {
            fail,
            first_call_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    pub fn published(&self) -> Vec<PublishedEnvelope> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for MockPublisher {
    async fn publish(&self, envelope: &PublishedEnvelope) -> Result<PublishReceipt, PublishError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.first_call_delay.filter(|_| attempt == 0) {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(PublishError::Broker("leader not available".to_string()));
        }
        let mut published = self.published.lock().unwrap();
        published.push(envelope.clone());
        Ok(PublishReceipt {
            partition: 0,
            offset: published.len() as i64 - 1,
        })
    }
}

/// Store that is never reachable
pub struct DownStore;

#[async_trait]
impl AdmissionStore for DownStore {
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

pub fn test_config(requests_per_window: u32) -> Config {
    let mut config = Config::default();
    config.rate_limit.requests_per_window = requests_per_window;
    config.rate_limit.window_seconds = 3600;
    config
}

pub fn app_with(
    config: &Config,
    store: Arc<dyn AdmissionStore>,
    publisher: Arc<dyn EventPublisher>,
) -> Router {
    let tenants = Arc::new(TenantDirectory::parse(&config.tenants.api_keys).unwrap());
    let pipeline = Arc::new(AdmissionPipeline::from_config(
        config,
        tenants,
        Arc::clone(&store),
        publisher,
    ));
    create_router(GatewayState::new(pipeline, store), &config.server)
}

pub fn app(requests_per_window: u32, publisher: Arc<MockPublisher>) -> Router {
    app_with(
        &test_config(requests_per_window),
        Arc::new(InMemoryAdmissionStore::new()),
        publisher,
    )
}
