//! Admission state machine.
//!
//! Every submission walks the same path; each arrow is one [`Step`] whose
//! result comes back as a [`StageSignal`]:
//!
//! ```text
//!  Received ─► Authenticated ─► Validated ─┬─► Claimed ─┬─► RateAdmitted ─► Published ─► Accepted
//!                                          │            │                      ▲
//!                                          │            └──(rate disabled)─────┤
//!                                          └─► DuplicateResolved ─────────────────────► Accepted
//!
//!  any non-terminal state ──(rejection)──► Failed
//! ```
//!
//! [`AdmissionState::next_step`] and [`AdmissionState::advance`] are pure:
//! no I/O, no clock. The driver in [`super::pipeline`] performs the step and
//! feeds its outcome back.

use std::fmt;
use uuid::Uuid;

use crate::application::errors::IngestError;
use crate::domain::{IdempotencyKey, InboundEvent, TenantId};
use crate::infrastructure::publisher::PublishReceipt;
use crate::infrastructure::rate_limiter::RateDecision;

use super::pipeline::AdmissionOutcome;

/// Which optional stages run, fixed at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionPolicy {
    pub idempotency_enabled: bool,
    pub rate_limit_enabled: bool,
    /// Delete this request's claim when its publish fails
    pub release_on_publish_failure: bool,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self {
            idempotency_enabled: true,
            rate_limit_enabled: true,
            release_on_publish_failure: true,
        }
    }
}

/// What is known about a request once it is authenticated and validated
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionContext {
    pub tenant: TenantId,
    pub event: InboundEvent,
    pub idempotency_key: IdempotencyKey,
    /// This request created the idempotency record (as opposed to the store
    /// being unavailable, or the stage being disabled)
    pub claim_held: bool,
    /// Set when the rate counter answered
    pub rate: Option<RateDecision>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionState {
    Received,
    Authenticated { tenant: TenantId },
    Validated(AdmissionContext),
    Claimed(AdmissionContext),
    DuplicateResolved(AdmissionContext),
    RateAdmitted(AdmissionContext),
    Published {
        context: AdmissionContext,
        receipt: PublishReceipt,
    },
    Accepted(AdmissionOutcome),
    Failed(IngestError),
}

/// Work the driver performs to leave the current state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Authenticate,
    Validate,
    ResolveIdempotency,
    EnforceRateLimit,
    Publish,
    Finalize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed,
    AlreadyClaimed,
    /// Store unreachable; admission continues without a record
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateOutcome {
    Allowed(RateDecision),
    Denied {
        decision: RateDecision,
        window_seconds: u64,
    },
    /// Store unreachable; admission continues uncounted
    Unavailable,
}

/// Result of performing a [`Step`]
#[derive(Debug, Clone, PartialEq)]
pub enum StageSignal {
    Authenticated(TenantId),
    Validated {
        event: InboundEvent,
        idempotency_key: IdempotencyKey,
    },
    Claim(ClaimOutcome),
    Rate(RateOutcome),
    Published(PublishReceipt),
    PublishFailed,
    Finalized { request_id: Uuid },
    Rejected(IngestError),
}

impl AdmissionState {
    /// The step that leaves this state, or `None` once terminal.
    pub fn next_step(&self, policy: &AdmissionPolicy) -> Option<Step> {
        match self {
            Self::Received => Some(Step::Authenticate),
            Self::Authenticated { .. } => Some(Step::Validate),
            Self::Validated(_) if policy.idempotency_enabled => Some(Step::ResolveIdempotency),
            Self::Validated(_) | Self::Claimed(_) if policy.rate_limit_enabled => {
                Some(Step::EnforceRateLimit)
            }
            Self::Validated(_) | Self::Claimed(_) | Self::RateAdmitted(_) => Some(Step::Publish),
            Self::DuplicateResolved(_) | Self::Published { .. } => Some(Step::Finalize),
            Self::Accepted(_) | Self::Failed(_) => None,
        }
    }

    /// Apply a step's result. A signal that does not fit the state is an
    /// internal fault and fails the request.
    pub fn advance(self, signal: StageSignal, policy: &AdmissionPolicy) -> AdmissionState {
        use AdmissionState as S;
        use StageSignal as Sig;

        match (self, signal) {
            (state, _) if state.is_terminal() => state,
            (_, Sig::Rejected(error)) => S::Failed(error),

            (S::Received, Sig::Authenticated(tenant)) => S::Authenticated { tenant },

            (
                S::Authenticated { tenant },
                Sig::Validated {
                    event,
                    idempotency_key,
                },
            ) => S::Validated(AdmissionContext {
                tenant,
                event,
                idempotency_key,
                claim_held: false,
                rate: None,
            }),

            (S::Validated(context), Sig::Claim(outcome)) if policy.idempotency_enabled => {
                match outcome {
                    ClaimOutcome::Claimed => S::Claimed(AdmissionContext {
                        claim_held: true,
                        ..context
                    }),
                    ClaimOutcome::Unavailable => S::Claimed(context),
                    ClaimOutcome::AlreadyClaimed => S::DuplicateResolved(context),
                }
            }

            (S::Claimed(context), Sig::Rate(outcome)) if policy.rate_limit_enabled => {
                admit_rate(context, outcome)
            }
            (S::Validated(context), Sig::Rate(outcome))
                if policy.rate_limit_enabled && !policy.idempotency_enabled =>
            {
                admit_rate(context, outcome)
            }

            (S::RateAdmitted(context), Sig::Published(receipt)) => {
                S::Published { context, receipt }
            }
            (S::Claimed(context), Sig::Published(receipt)) if !policy.rate_limit_enabled => {
                S::Published { context, receipt }
            }
            (S::Validated(context), Sig::Published(receipt))
                if !policy.rate_limit_enabled && !policy.idempotency_enabled =>
            {
                S::Published { context, receipt }
            }
            (S::RateAdmitted(_) | S::Claimed(_) | S::Validated(_), Sig::PublishFailed) => {
                S::Failed(IngestError::internal("Failed to publish event"))
            }

            (S::DuplicateResolved(context), Sig::Finalized { request_id }) => {
                S::Accepted(AdmissionOutcome {
                    request_id,
                    tenant: context.tenant,
                    duplicate: true,
                    rate: None,
                    receipt: None,
                })
            }
            (S::Published { context, receipt }, Sig::Finalized { request_id }) => {
                S::Accepted(AdmissionOutcome {
                    request_id,
                    tenant: context.tenant,
                    duplicate: false,
                    rate: context.rate,
                    receipt: Some(receipt),
                })
            }

            (state, signal) => {
                tracing::error!(
                    state = %state,
                    signal = ?signal,
                    "Invalid admission transition"
                );
                S::Failed(IngestError::internal("Internal server error"))
            }
        }
    }

    /// Whether this state ends the request
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted(_) | Self::Failed(_))
    }

    /// Request details, once validated and until terminal
    pub fn context(&self) -> Option<&AdmissionContext> {
        match self {
            Self::Validated(context)
            | Self::Claimed(context)
            | Self::DuplicateResolved(context)
            | Self::RateAdmitted(context)
            | Self::Published { context, .. } => Some(context),
            _ => None,
        }
    }
}

fn admit_rate(context: AdmissionContext, outcome: RateOutcome) -> AdmissionState {
    match outcome {
        RateOutcome::Allowed(decision) => AdmissionState::RateAdmitted(AdmissionContext {
            rate: Some(decision),
            ..context
        }),
        RateOutcome::Unavailable => AdmissionState::RateAdmitted(context),
        RateOutcome::Denied {
            decision,
            window_seconds,
        } => AdmissionState::Failed(IngestError::RateLimited {
            limit: decision.limit,
            window_seconds,
            retry_after: decision.retry_after.unwrap_or(window_seconds),
            reset_at: decision.reset_at,
        }),
    }
}

impl fmt::Display for AdmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "Received",
            Self::Authenticated { .. } => "Authenticated",
            Self::Validated(_) => "Validated",
            Self::Claimed(_) => "Claimed",
            Self::DuplicateResolved(_) => "DuplicateResolved",
            Self::RateAdmitted(_) => "RateAdmitted",
            Self::Published { .. } => "Published",
            Self::Accepted(_) => "Accepted",
            Self::Failed(_) => "Failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> InboundEvent {
        InboundEvent::parse(
            br#"{"event_id":"e1","event_type":"click","schema_version":1,"occurred_at":"2024-01-01T00:00:00Z","payload":{}}"#,
        )
        .unwrap()
    }

    fn validated() -> AdmissionState {
        AdmissionState::Validated(AdmissionContext {
            tenant: TenantId::new("tenant_a"),
            event: event(),
            idempotency_key: IdempotencyKey::from_header(Some("k1")).unwrap(),
            claim_held: false,
            rate: None,
        })
    }

    fn receipt() -> PublishReceipt {
        PublishReceipt {
            partition: 0,
            offset: 7,
        }
    }

    fn policy(idempotency_enabled: bool, rate_limit_enabled: bool) -> AdmissionPolicy {
        AdmissionPolicy {
            idempotency_enabled,
            rate_limit_enabled,
            release_on_publish_failure: true,
        }
    }

    #[test]
    fn test_happy_path() {
        let policy = AdmissionPolicy::default();
        let request_id = Uuid::new_v4();

        let state = AdmissionState::Received;
        assert_eq!(state.next_step(&policy), Some(Step::Authenticate));

        let state = state.advance(StageSignal::Authenticated(TenantId::new("tenant_a")), &policy);
        assert_eq!(state.next_step(&policy), Some(Step::Validate));

        let state = state.advance(
            StageSignal::Validated {
                event: event(),
                idempotency_key: IdempotencyKey::from_header(Some("k1")).unwrap(),
            },
            &policy,
        );
        assert_eq!(state.next_step(&policy), Some(Step::ResolveIdempotency));

        let state = state.advance(StageSignal::Claim(ClaimOutcome::Claimed), &policy);
        assert!(state.context().unwrap().claim_held);
        assert_eq!(state.next_step(&policy), Some(Step::EnforceRateLimit));

        let decision = RateDecision::allowed(2, 1, 60);
        let state = state.advance(
            StageSignal::Rate(RateOutcome::Allowed(decision.clone())),
            &policy,
        );
        assert_eq!(state.next_step(&policy), Some(Step::Publish));

        let state = state.advance(StageSignal::Published(receipt()), &policy);
        assert_eq!(state.next_step(&policy), Some(Step::Finalize));

        let state = state.advance(StageSignal::Finalized { request_id }, &policy);
        assert_eq!(state.next_step(&policy), None);
        match state {
            AdmissionState::Accepted(outcome) => {
                assert_eq!(outcome.request_id, request_id);
                assert!(!outcome.duplicate);
                assert_eq!(outcome.rate, Some(decision));
                assert_eq!(outcome.receipt, Some(receipt()));
            }
            other => panic!("expected Accepted, got {other}"),
        }
    }

    #[test]
    fn test_duplicate_skips_rate_and_publish() {
        let policy = AdmissionPolicy::default();

        let state = validated().advance(StageSignal::Claim(ClaimOutcome::AlreadyClaimed), &policy);
        assert!(matches!(state, AdmissionState::DuplicateResolved(_)));
        assert_eq!(state.next_step(&policy), Some(Step::Finalize));

        let state = state.advance(
            StageSignal::Finalized {
                request_id: Uuid::new_v4(),
            },
            &policy,
        );
        match state {
            AdmissionState::Accepted(outcome) => {
                assert!(outcome.duplicate);
                assert!(outcome.receipt.is_none());
            }
            other => panic!("expected Accepted, got {other}"),
        }
    }

    #[test]
    fn test_store_unavailable_fails_open() {
        let policy = AdmissionPolicy::default();

        let state = validated().advance(StageSignal::Claim(ClaimOutcome::Unavailable), &policy);
        assert!(matches!(state, AdmissionState::Claimed(_)));
        assert!(!state.context().unwrap().claim_held);

        let state = state.advance(StageSignal::Rate(RateOutcome::Unavailable), &policy);
        assert!(matches!(state, AdmissionState::RateAdmitted(_)));
        assert_eq!(state.next_step(&policy), Some(Step::Publish));
    }

    #[test]
    fn test_rate_denied_fails() {
        let policy = AdmissionPolicy::default();
        let state = validated().advance(StageSignal::Claim(ClaimOutcome::Claimed), &policy);

        let state = state.advance(
            StageSignal::Rate(RateOutcome::Denied {
                decision: RateDecision::blocked(2, 120, 15),
                window_seconds: 60,
            }),
            &policy,
        );

        assert_eq!(
            state,
            AdmissionState::Failed(IngestError::RateLimited {
                limit: 2,
                window_seconds: 60,
                retry_after: 15,
                reset_at: 120,
            })
        );
        assert!(state.is_terminal());
    }

    #[test]
    fn test_publish_failure_is_internal() {
        let policy = AdmissionPolicy::default();
        let state = validated()
            .advance(StageSignal::Claim(ClaimOutcome::Claimed), &policy)
            .advance(StageSignal::Rate(RateOutcome::Unavailable), &policy)
            .advance(StageSignal::PublishFailed, &policy);

        assert_eq!(
            state,
            AdmissionState::Failed(IngestError::internal("Failed to publish event"))
        );
    }

    #[test]
    fn test_disabled_stages_are_skipped() {
        let no_idempotency = policy(false, true);
        assert_eq!(
            validated().next_step(&no_idempotency),
            Some(Step::EnforceRateLimit)
        );

        let no_rate = policy(true, false);
        let claimed = validated().advance(StageSignal::Claim(ClaimOutcome::Claimed), &no_rate);
        assert_eq!(claimed.next_step(&no_rate), Some(Step::Publish));
        let published = claimed.advance(StageSignal::Published(receipt()), &no_rate);
        assert!(matches!(published, AdmissionState::Published { .. }));

        let neither = policy(false, false);
        assert_eq!(validated().next_step(&neither), Some(Step::Publish));
        let published = validated().advance(StageSignal::Published(receipt()), &neither);
        assert!(matches!(published, AdmissionState::Published { .. }));
    }

    #[test]
    fn test_signal_for_disabled_stage_is_rejected() {
        let no_idempotency = policy(false, true);
        let state = validated().advance(StageSignal::Claim(ClaimOutcome::Claimed), &no_idempotency);
        assert!(matches!(
            state,
            AdmissionState::Failed(IngestError::Internal { .. })
        ));
    }

    #[test]
    fn test_rejection_from_any_stage() {
        let policy = AdmissionPolicy::default();

        let state = AdmissionState::Received.advance(
            StageSignal::Rejected(IngestError::unauthorized("Invalid API key")),
            &policy,
        );
        assert_eq!(
            state,
            AdmissionState::Failed(IngestError::unauthorized("Invalid API key"))
        );

        let state = AdmissionState::Authenticated {
            tenant: TenantId::new("tenant_a"),
        }
        .advance(
            StageSignal::Rejected(IngestError::validation("event_id is required")),
            &policy,
        );
        assert!(matches!(
            state,
            AdmissionState::Failed(IngestError::Validation { .. })
        ));
    }

    #[test]
    fn test_out_of_order_signal_fails_internally() {
        let policy = AdmissionPolicy::default();
        let state = AdmissionState::Received.advance(StageSignal::Published(receipt()), &policy);
        assert!(matches!(
            state,
            AdmissionState::Failed(IngestError::Internal { .. })
        ));
    }

    #[test]
    fn test_terminal_states_absorb_signals() {
        let policy = AdmissionPolicy::default();
        let failed = AdmissionState::Failed(IngestError::validation("x"));

        let after = failed
            .clone()
            .advance(StageSignal::Authenticated(TenantId::new("t")), &policy);
        assert_eq!(after, failed);
        assert_eq!(after.next_step(&policy), None);
    }
}
