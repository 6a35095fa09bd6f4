//! Rate Limiting Infrastructure
//!
//! Per-tenant fixed-window counters kept in the admission store:
//! - windows are aligned to the UTC wall clock, so every instance agrees on
//!   the current bucket
//! - a burst straddling a boundary can reach twice the limit

pub mod fixed_window;
pub mod types;

pub use fixed_window::FixedWindowLimiter;
pub use types::RateDecision;
