//! Admission pipeline driver.
//!
//! ```text
//! Front end         AdmissionPipeline        TenantDirectory / Store / Publisher
//!     │                     │                            │
//!     ├─ admit(request) ───►│                            │
//!     │                     │── next_step ──► perform ──►│
//!     │                     │◄── StageSignal ────────────┤
//!     │                     │── advance ─┐               │
//!     │                     │◄───────────┘  (repeat until terminal)
//!     │◄── outcome/error ───┤                            │
//! ```
//!
//! The driver holds no per-request state between calls. Every atomic
//! decision is made by the store, so any number of requests may run through
//! one pipeline concurrently.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::state::{
    AdmissionContext, AdmissionPolicy, AdmissionState, ClaimOutcome, RateOutcome, StageSignal,
    Step,
};
use crate::application::errors::IngestError;
use crate::config::Config;
use crate::domain::{IdempotencyKey, InboundEvent, PublishedEnvelope, TenantId};
use crate::infrastructure::idempotency::{ClaimResult, IdempotencyStore};
use crate::infrastructure::publisher::{EventPublisher, PublishReceipt};
use crate::infrastructure::rate_limiter::{FixedWindowLimiter, RateDecision};
use crate::infrastructure::store::AdmissionStore;
use crate::infrastructure::tenant_directory::TenantDirectory;

/// Everything the front end extracts from an HTTP submission
#[derive(Debug, Clone, Default)]
pub struct AdmissionRequest {
    /// `X-API-Key` header
    pub credential: Option<String>,
    /// `Idempotency-Key` header
    pub idempotency_key: Option<String>,
    /// Raw request body
    pub body: Bytes,
}

/// An accepted submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionOutcome {
    pub request_id: Uuid,
    pub tenant: TenantId,
    /// A live idempotency record already existed; nothing was published
    pub duplicate: bool,
    /// Counter state after this request, when the rate stage ran and answered
    pub rate: Option<RateDecision>,
    pub receipt: Option<PublishReceipt>,
}

/// Runs submissions through the admission state machine.
#[derive(Clone)]
pub struct AdmissionPipeline {
    tenants: Arc<TenantDirectory>,
    idempotency: IdempotencyStore,
    limiter: FixedWindowLimiter,
    publisher: Arc<dyn EventPublisher>,
    policy: AdmissionPolicy,
}

impl AdmissionPipeline {
    pub fn new(
        tenants: Arc<TenantDirectory>,
        idempotency: IdempotencyStore,
        limiter: FixedWindowLimiter,
        publisher: Arc<dyn EventPublisher>,
        policy: AdmissionPolicy,
    ) -> Self {
        Self {
            tenants,
            idempotency,
            limiter,
            publisher,
            policy,
        }
    }

    /// Wire the pipeline from configuration over a shared store.
    pub fn from_config(
        config: &Config,
        tenants: Arc<TenantDirectory>,
        store: Arc<dyn AdmissionStore>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        let idempotency = IdempotencyStore::new(
            Arc::clone(&store),
            config.idempotency.key_prefix.clone(),
            Duration::from_secs(config.idempotency.ttl_seconds),
        );
        let limiter = FixedWindowLimiter::new(
            store,
            config.rate_limit.key_prefix.clone(),
            config.rate_limit.requests_per_window,
            config.rate_limit.window_seconds,
        );
        let policy = AdmissionPolicy {
            idempotency_enabled: config.idempotency.enabled,
            rate_limit_enabled: config.rate_limit.enabled,
            release_on_publish_failure: config.idempotency.release_on_publish_failure,
        };

        Self::new(tenants, idempotency, limiter, publisher, policy)
    }

    pub fn policy(&self) -> &AdmissionPolicy {
        &self.policy
    }

    /// Admit one submission. Returns exactly one outcome or error; each side
    /// effect happens at most once.
    pub async fn admit(&self, request: AdmissionRequest) -> Result<AdmissionOutcome, IngestError> {
        let request_id = Uuid::new_v4();
        let received_at = Utc::now();
        let AdmissionRequest {
            credential,
            idempotency_key,
            body,
        } = request;

        let mut state = AdmissionState::Received;

        while let Some(step) = state.next_step(&self.policy) {
            let signal = match (step, state.context()) {
                (Step::Authenticate, _) => self.authenticate(credential.as_deref()),
                (Step::Validate, _) => validate(&body, idempotency_key.as_deref()),
                (Step::ResolveIdempotency, Some(context)) => {
                    self.resolve_idempotency(context).await
                }
                (Step::EnforceRateLimit, Some(context)) => self.enforce_rate_limit(context).await,
                (Step::Publish, Some(context)) => {
                    self.publish(context, request_id, received_at).await
                }
                (Step::Finalize, _) => StageSignal::Finalized { request_id },
                (step, None) => {
                    error!(?step, state = %state, "Admission step reached without request context");
                    StageSignal::Rejected(IngestError::internal("Internal server error"))
                }
            };

            state = state.advance(signal, &self.policy);
        }

        match state {
            AdmissionState::Accepted(outcome) => {
                debug!(
                    request_id = %outcome.request_id,
                    tenant = %outcome.tenant,
                    duplicate = outcome.duplicate,
                    "Event accepted"
                );
                Ok(outcome)
            }
            AdmissionState::Failed(error) => Err(error),
            other => {
                error!(state = %other, "Admission stopped in a non-terminal state");
                Err(IngestError::internal("Internal server error"))
            }
        }
    }

    fn authenticate(&self, credential: Option<&str>) -> StageSignal {
        match credential {
            None | Some("") => {
                StageSignal::Rejected(IngestError::unauthorized("X-API-Key header is required"))
            }
            Some(credential) => match self.tenants.resolve(credential) {
                Some(tenant) => StageSignal::Authenticated(tenant.clone()),
                None => StageSignal::Rejected(IngestError::unauthorized("Invalid API key")),
            },
        }
    }

    async fn resolve_idempotency(&self, context: &AdmissionContext) -> StageSignal {
        match self
            .idempotency
            .claim(&context.tenant, &context.idempotency_key)
            .await
        {
            Ok(ClaimResult::Claimed) => StageSignal::Claim(ClaimOutcome::Claimed),
            Ok(ClaimResult::AlreadyClaimed) => {
                debug!(
                    tenant = %context.tenant,
                    idempotency_key = %context.idempotency_key,
                    "Duplicate submission"
                );
                StageSignal::Claim(ClaimOutcome::AlreadyClaimed)
            }
            Err(e) => {
                warn!(
                    tenant = %context.tenant,
                    error = %e,
                    "Idempotency check failed, admitting without deduplication"
                );
                StageSignal::Claim(ClaimOutcome::Unavailable)
            }
        }
    }

    async fn enforce_rate_limit(&self, context: &AdmissionContext) -> StageSignal {
        match self.limiter.admit(&context.tenant).await {
            Ok(decision) if decision.allowed => StageSignal::Rate(RateOutcome::Allowed(decision)),
            Ok(decision) => StageSignal::Rate(RateOutcome::Denied {
                decision,
                window_seconds: self.limiter.window_seconds(),
            }),
            Err(e) => {
                warn!(
                    tenant = %context.tenant,
                    error = %e,
                    "Rate limit check failed, admitting uncounted"
                );
                StageSignal::Rate(RateOutcome::Unavailable)
            }
        }
    }

    async fn publish(
        &self,
        context: &AdmissionContext,
        request_id: Uuid,
        received_at: DateTime<Utc>,
    ) -> StageSignal {
        let envelope = PublishedEnvelope::new(
            context.tenant.clone(),
            received_at,
            request_id,
            context.idempotency_key.clone(),
            context.event.clone(),
        );

        match self.publisher.publish(&envelope).await {
            Ok(receipt) => StageSignal::Published(receipt),
            Err(e) => {
                error!(
                    request_id = %request_id,
                    tenant = %context.tenant,
                    error = %e,
                    "Failed to publish event"
                );

                if context.claim_held && self.policy.release_on_publish_failure {
                    if let Err(release_error) = self
                        .idempotency
                        .release(&context.tenant, &context.idempotency_key)
                        .await
                    {
                        warn!(
                            tenant = %context.tenant,
                            idempotency_key = %context.idempotency_key,
                            error = %release_error,
                            "Failed to release idempotency claim after publish failure"
                        );
                    }
                }

                StageSignal::PublishFailed
            }
        }
    }
}

/// Body first, then the idempotency header.
fn validate(body: &[u8], idempotency_key: Option<&str>) -> StageSignal {
    let validated = InboundEvent::parse(body).and_then(|event| {
        IdempotencyKey::from_header(idempotency_key).map(|idempotency_key| (event, idempotency_key))
    });

    match validated {
        Ok((event, idempotency_key)) => StageSignal::Validated {
            event,
            idempotency_key,
        },
        Err(e) => StageSignal::Rejected(e.into()),
    }
}
