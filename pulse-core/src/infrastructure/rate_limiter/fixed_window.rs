//! Fixed window counter

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use super::types::RateDecision;
use crate::domain::TenantId;
use crate::infrastructure::store::{AdmissionStore, StoreError};

/// Counts requests per tenant in wall-clock aligned windows.
///
/// Every check increments; the counter is never read on its own. A denied
/// request's increment stays in the bucket.
#[derive(Clone)]
pub struct FixedWindowLimiter {
    store: Arc<dyn AdmissionStore>,
    key_prefix: String,
    limit: u32,
    window_seconds: u64,
}

impl FixedWindowLimiter {
    pub fn new(
        store: Arc<dyn AdmissionStore>,
        key_prefix: impl Into<String>,
        limit: u32,
        window_seconds: u64,
    ) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
            limit,
            window_seconds: window_seconds.max(1),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window_seconds(&self) -> u64 {
        self.window_seconds
    }

    /// Start of the window containing `now`, as a Unix timestamp
    pub fn window_start(&self, now: DateTime<Utc>) -> i64 {
        let ts = now.timestamp();
        ts - ts.rem_euclid(self.window_seconds as i64)
    }

    /// Bucket label: the window start as `%Y-%m-%dT%H:%M`, with `:%S` when
    /// the window is not a whole number of minutes.
    pub fn bucket(&self, now: DateTime<Utc>) -> String {
        let start = DateTime::from_timestamp(self.window_start(now), 0).unwrap_or(now);
        let format = if self.window_seconds % 60 == 0 {
            "%Y-%m-%dT%H:%M"
        } else {
            "%Y-%m-%dT%H:%M:%S"
        };
        start.format(format).to_string()
    }

    /// Store key of the tenant's counter for the window containing `now`
    pub fn bucket_key(&self, tenant: &TenantId, now: DateTime<Utc>) -> String {
        format!("{}:{}:{}", self.key_prefix, tenant, self.bucket(now))
    }

    /// Count one request against the tenant's current window.
    pub async fn admit(&self, tenant: &TenantId) -> Result<RateDecision, StoreError> {
        self.admit_at(tenant, Utc::now()).await
    }

    /// Same as [`admit`](Self::admit) with an explicit clock reading.
    pub async fn admit_at(
        &self,
        tenant: &TenantId,
        now: DateTime<Utc>,
    ) -> Result<RateDecision, StoreError> {
        let key = self.bucket_key(tenant, now);
        let count = self
            .store
            .increment(&key, Duration::from_secs(self.window_seconds))
            .await?;

        let reset_at = (self.window_start(now) + self.window_seconds as i64).max(0) as u64;
        let limit = u64::from(self.limit);

        if count > limit {
            let retry_after = reset_at.saturating_sub(now.timestamp().max(0) as u64).max(1);
            tracing::debug!(
                tenant = %tenant,
                count = count,
                limit = self.limit,
                "Tenant exceeded rate limit"
            );
            return Ok(RateDecision::blocked(self.limit, reset_at, retry_after));
        }

        Ok(RateDecision::allowed(
            self.limit,
            (limit - count) as u32,
            reset_at,
        ))
    }
}
