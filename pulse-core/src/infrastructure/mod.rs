//! Infrastructure layer: shared-state primitives, event log and tenant lookup

pub mod idempotency;
pub mod publisher;
pub mod rate_limiter;
pub mod resilience;
pub mod store;
pub mod tenant_directory;

pub use idempotency::{ClaimResult, IdempotencyStore};
pub use publisher::{EventPublisher, KafkaEventPublisher, PublishError, PublishReceipt};
pub use rate_limiter::{FixedWindowLimiter, RateDecision};
pub use store::{AdmissionStore, DragonflyAdmissionStore, InMemoryAdmissionStore, StoreError};
pub use tenant_directory::TenantDirectory;
