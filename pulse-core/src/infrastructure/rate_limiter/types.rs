//! Rate limiter types

/// Result of a rate limit check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateDecision {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Maximum requests allowed in the current window
    pub limit: u32,
    /// Remaining requests in the current window
    pub remaining: u32,
    /// Unix timestamp when the current window ends
    pub reset_at: u64,
    /// Retry-After duration in seconds (only set when blocked)
    pub retry_after: Option<u64>,
}

impl RateDecision {
    /// Create a new allowed result
    pub fn allowed(limit: u32, remaining: u32, reset_at: u64) -> Self {
        Self {
            allowed: true,
            limit,
            remaining,
            reset_at,
            retry_after: None,
        }
    }

    /// Create a new blocked result
    pub fn blocked(limit: u32, reset_at: u64, retry_after: u64) -> Self {
        Self {
            allowed: false,
            limit,
            remaining: 0,
            reset_at,
            retry_after: Some(retry_after),
        }
    }
}
