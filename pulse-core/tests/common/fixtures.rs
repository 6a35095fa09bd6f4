//! Test fixtures for the admission pipeline

use bytes::Bytes;
use std::sync::Arc;

use pulse_core::Config;
use pulse_core::application::{AdmissionPipeline, AdmissionRequest};
use pulse_core::infrastructure::publisher::EventPublisher;
use pulse_core::infrastructure::store::AdmissionStore;
use pulse_core::infrastructure::tenant_directory::TenantDirectory;

pub const TENANT_A_KEY: &str = "key_a";
pub const TENANT_B_KEY: &str = "key_b";

pub fn valid_body() -> Bytes {
    Bytes::from_static(
        br#"{"event_id":"e1","event_type":"click","schema_version":1,"occurred_at":"2024-01-01T00:00:00Z","payload":{}}"#,
    )
}

pub fn request(credential: &str, idempotency_key: &str) -> AdmissionRequest {
    AdmissionRequest {
        credential: Some(credential.to_string()),
        idempotency_key: Some(idempotency_key.to_string()),
        body: valid_body(),
    }
}

/// Default configuration with the given per-window budget
pub fn test_config(requests_per_window: u32) -> Config {
    let mut config = Config::default();
    config.rate_limit.requests_per_window = requests_per_window;
    config.rate_limit.window_seconds = 3600;
    config
}

pub fn test_tenants() -> Arc<TenantDirectory> {
    Arc::new(TenantDirectory::parse("tenant_a:key_a,tenant_b:key_b").unwrap())
}

pub fn pipeline_with(
    config: &Config,
    store: Arc<dyn AdmissionStore>,
    publisher: Arc<dyn EventPublisher>,
) -> AdmissionPipeline {
    AdmissionPipeline::from_config(config, test_tenants(), store, publisher)
}
