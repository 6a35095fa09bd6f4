//! Domain models for event admission

pub mod envelope;
pub mod event;
pub mod tenant;

pub use envelope::PublishedEnvelope;
pub use event::{EventValidationError, IdempotencyKey, InboundEvent};
pub use tenant::TenantId;
