//! Idempotency claims over the admission store

use std::sync::Arc;
use std::time::Duration;

use super::store::{AdmissionStore, StoreError};
use crate::domain::{IdempotencyKey, TenantId};

/// Outcome of claiming an idempotency key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimResult {
    /// No live record existed; this request created it
    Claimed,
    /// A live record exists; the request is a duplicate
    AlreadyClaimed,
}

/// Creates and releases idempotency records, one per `(tenant, key)`.
///
/// A record only says "seen"; no response is stored with it.
#[derive(Clone)]
pub struct IdempotencyStore {
    store: Arc<dyn AdmissionStore>,
    key_prefix: String,
    ttl: Duration,
}

impl IdempotencyStore {
    pub fn new(store: Arc<dyn AdmissionStore>, key_prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
            ttl,
        }
    }

    /// Store key for a tenant's idempotency token, e.g. `idem:tenant_a:abc`
    pub fn record_key(&self, tenant: &TenantId, key: &IdempotencyKey) -> String {
        format!("{}:{}:{}", self.key_prefix, tenant, key)
    }

    /// Atomically claim the key. Exactly one concurrent caller wins.
    pub async fn claim(
        &self,
        tenant: &TenantId,
        key: &IdempotencyKey,
    ) -> Result<ClaimResult, StoreError> {
        let created = self
            .store
            .set_if_absent(&self.record_key(tenant, key), self.ttl)
            .await?;

        Ok(if created {
            ClaimResult::Claimed
        } else {
            ClaimResult::AlreadyClaimed
        })
    }

    /// Delete a claim this process created.
    pub async fn release(&self, tenant: &TenantId, key: &IdempotencyKey) -> Result<(), StoreError> {
        self.store.delete(&self.record_key(tenant, key)).await
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
