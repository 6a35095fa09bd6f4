//! Client-visible error taxonomy

use thiserror::Error;

use crate::domain::EventValidationError;

/// Every way an admission can end without an accept. Messages are safe to
/// show to the caller; infrastructure detail is logged, never embedded here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    #[error("{message}")]
    Validation { message: String },

    #[error("{message}")]
    Unauthorized { message: String },

    #[error("Rate limit exceeded: {limit} requests per {window_seconds} seconds")]
    RateLimited {
        limit: u32,
        window_seconds: u64,
        /// Seconds until the current window closes
        retry_after: u64,
        /// Unix timestamp when the current window closes
        reset_at: u64,
    },

    #[error("{message}")]
    Internal { message: String },
}

impl IngestError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Machine-readable code carried in the error envelope
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::Validation { .. } => "VALIDATION_ERROR",
            IngestError::Unauthorized { .. } => "UNAUTHORIZED",
            IngestError::RateLimited { .. } => "RATE_LIMITED",
            IngestError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Whether the failure is the caller's to fix (4xx) rather than ours (5xx)
    pub fn is_client_error(&self) -> bool {
        !matches!(self, IngestError::Internal { .. })
    }
}

impl From<EventValidationError> for IngestError {
    fn from(error: EventValidationError) -> Self {
        IngestError::validation(error.to_string())
    }
}
