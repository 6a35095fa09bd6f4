//! Message published to the event log for each admitted request

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{IdempotencyKey, InboundEvent, TenantId};

/// The inbound event plus ingestion metadata. Downstream consumers read the
/// original event from the nested `event` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedEnvelope {
    pub tenant_id: TenantId,
    /// RFC 3339, UTC, second precision
    pub received_at: String,
    pub request_id: Uuid,
    pub idempotency_key: IdempotencyKey,
    pub event: InboundEvent,
}

impl PublishedEnvelope {
    pub fn new(
        tenant_id: TenantId,
        received_at: DateTime<Utc>,
        request_id: Uuid,
        idempotency_key: IdempotencyKey,
        event: InboundEvent,
    ) -> Self {
        Self {
            tenant_id,
            received_at: received_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            request_id,
            idempotency_key,
            event,
        }
    }

    /// Self-describing encoding written to the log.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
