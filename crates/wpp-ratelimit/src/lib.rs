//! WPP Rate Limit - call admission for rate-limited external APIs
//!
//! This crate guards outbound calls (Telegram notifications, hosted API
//! requests) against quota exhaustion:
//!
//! - **Two horizons**: a per-minute and a per-hour sliding window, enforced together
//! - **Advisory**: the limiter only answers "may I call now?"; callers enforce
//! - **Lazy pruning**: stale timestamps are dropped as a side effect of checks
//! - **Shared handle**: an atomic check-and-record wrapper for concurrent callers
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use wpp_ratelimit::CallAdmissionLimiter;
//!
//! // 10 calls per minute, 100 calls per hour
//! let mut limiter = CallAdmissionLimiter::default();
//!
//! if limiter.can_make_call() {
//!     send_notification().await;
//!     limiter.record_call();
//! } else {
//!     let wait = limiter.wait_time();
//!     tokio::time::sleep(wait).await;
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod admission;
mod clock;
mod shared;

pub use admission::*;
pub use clock::*;
pub use shared::*;

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

/// Common trait for rate limiters shared between tasks.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Try to acquire a permit without blocking.
    ///
    /// Returns `true` if the call is allowed (and recorded), `false` if rate limited.
    async fn try_acquire(&self) -> bool;

    /// Acquire a permit, waiting if necessary.
    ///
    /// Returns the time waited, or an error if the wait would exceed `max_wait`.
    async fn acquire(&self, max_wait: Duration) -> Result<Duration, RateLimitError>;

    /// Get the current remaining quota.
    fn remaining(&self) -> u32;

    /// Get the time until the next permit is available.
    async fn wait_time(&self) -> Duration;

    /// Reset the rate limiter state.
    async fn reset(&self);

    /// Get the current state as a snapshot.
    fn state(&self) -> RateLimitState;
}

/// Rate limiter state snapshot.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RateLimitState {
    /// Tightest cap currently in effect (minute or hour).
    pub limit: u32,

    /// Remaining calls before either horizon is exhausted.
    pub remaining: u32,

    /// Time until the next call would be admitted.
    pub reset_after: Duration,

    /// Whether currently rate limited.
    pub is_limited: bool,
}

/// Rate limit error.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// Call would exceed rate limit.
    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    Exceeded {
        /// Time to wait before retrying.
        retry_after: Duration,
    },

    /// Wait time would exceed maximum allowed.
    #[error("Wait time {wait_time:?} exceeds maximum {max_wait:?}")]
    WaitExceeded {
        /// Required wait time.
        wait_time: Duration,
        /// Maximum allowed wait.
        max_wait: Duration,
    },

    /// Invalid configuration.
    #[error("Invalid rate limit configuration: {0}")]
    InvalidConfig(String),
}

/// Quota configuration for a [`CallAdmissionLimiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QuotaConfig {
    /// Maximum calls in any trailing minute.
    #[serde(default = "default_per_minute")]
    pub per_minute: u32,

    /// Maximum calls in any trailing hour.
    #[serde(default = "default_per_hour")]
    pub per_hour: u32,
}

const fn default_per_minute() -> u32 {
    DEFAULT_CALLS_PER_MINUTE
}

const fn default_per_hour() -> u32 {
    DEFAULT_CALLS_PER_HOUR
}

impl QuotaConfig {
    /// Create a new quota configuration.
    #[must_use]
    pub const fn new(per_minute: u32, per_hour: u32) -> Self {
        Self {
            per_minute,
            per_hour,
        }
    }

    /// Check that both quotas are positive.
    ///
    /// An hourly quota below the minute quota is accepted but logged, since
    /// the hour cap then silently dominates.
    ///
    /// # Errors
    /// Returns [`RateLimitError::InvalidConfig`] if either quota is zero.
    pub fn validate(&self) -> Result<(), RateLimitError> {
        if self.per_minute == 0 {
            return Err(RateLimitError::InvalidConfig(
                "per_minute must be positive".into(),
            ));
        }
        if self.per_hour == 0 {
            return Err(RateLimitError::InvalidConfig(
                "per_hour must be positive".into(),
            ));
        }
        if self.per_hour < self.per_minute {
            warn!(
                per_minute = self.per_minute,
                per_hour = self.per_hour,
                "Hourly quota is below the per-minute quota"
            );
        }
        Ok(())
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CALLS_PER_MINUTE, DEFAULT_CALLS_PER_HOUR)
    }
}
