//! Two-horizon sliding window call admission.
//!
//! Tracks the instant of every recorded call and admits a new call only while
//! both the trailing minute and the trailing hour are under their caps.

use std::collections::VecDeque;
use std::time::Duration;

use tracing::warn;

use crate::{Clock, QuotaConfig, RateLimitError, RateLimitState, SystemClock};

/// Default per-minute quota.
pub const DEFAULT_CALLS_PER_MINUTE: u32 = 10;

/// Default per-hour quota.
pub const DEFAULT_CALLS_PER_HOUR: u32 = 100;

/// Short quota horizon.
pub const MINUTE_WINDOW: Duration = Duration::from_secs(60);

/// Long quota horizon.
pub const HOUR_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Wait reported when only the hourly quota is exhausted.
///
/// This is a flat backoff, not the time until the oldest hourly call expires.
pub const HOURLY_FALLBACK_WAIT: Duration = Duration::from_secs(60);

const MINUTE_MS: u64 = 60_000;
const HOUR_MS: u64 = 3_600_000;
const HOURLY_FALLBACK_MS: u64 = 60_000;

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Admit,
    MinuteExhausted { calls: usize, earliest: u64 },
    HourExhausted { calls: usize },
}

/// Sliding window limiter with a per-minute and a per-hour cap.
///
/// The limiter is advisory: it never blocks a call, it only reports whether a
/// call should be made. Callers record a call with [`record_call`] right
/// after it actually happened.
///
/// Stale timestamps (older than one hour) are pruned lazily by
/// [`can_make_call`], [`wait_time`] and the other read operations, never on
/// a timer.
///
/// This type is single-owner (`&mut self`). Use
/// [`SharedAdmissionLimiter`](crate::SharedAdmissionLimiter) when several
/// tasks draw from the same quota.
///
/// [`record_call`]: Self::record_call
/// [`can_make_call`]: Self::can_make_call
/// [`wait_time`]: Self::wait_time
#[derive(Debug, Clone)]
pub struct CallAdmissionLimiter<C = SystemClock> {
    /// Maximum calls in any trailing minute.
    max_calls_per_minute: u32,

    /// Maximum calls in any trailing hour.
    max_calls_per_hour: u32,

    /// Recorded call instants, in append order.
    call_timestamps: VecDeque<u64>,

    clock: C,
}

impl CallAdmissionLimiter<SystemClock> {
    /// Create a limiter over the wall clock.
    ///
    /// `max_calls_per_hour >= max_calls_per_minute` is expected but not
    /// enforced.
    #[must_use]
    pub fn new(max_calls_per_minute: u32, max_calls_per_hour: u32) -> Self {
        Self::with_clock(max_calls_per_minute, max_calls_per_hour, SystemClock)
    }

    /// Create from a validated configuration.
    ///
    /// # Errors
    /// Returns [`RateLimitError::InvalidConfig`] if a quota is zero.
    pub fn from_config(config: &QuotaConfig) -> Result<Self, RateLimitError> {
        config.validate()?;
        Ok(Self::new(config.per_minute, config.per_hour))
    }
}

impl Default for CallAdmissionLimiter<SystemClock> {
    fn default() -> Self {
        Self::new(DEFAULT_CALLS_PER_MINUTE, DEFAULT_CALLS_PER_HOUR)
    }
}

impl<C: Clock> CallAdmissionLimiter<C> {
    /// Create a limiter over an explicit clock.
    #[must_use]
    pub fn with_clock(max_calls_per_minute: u32, max_calls_per_hour: u32, clock: C) -> Self {
        Self {
            max_calls_per_minute,
            max_calls_per_hour,
            call_timestamps: VecDeque::new(),
            clock,
        }
    }

    /// Per-minute quota.
    #[must_use]
    pub const fn max_calls_per_minute(&self) -> u32 {
        self.max_calls_per_minute
    }

    /// Per-hour quota.
    #[must_use]
    pub const fn max_calls_per_hour(&self) -> u32 {
        self.max_calls_per_hour
    }

    /// Number of timestamps currently held, including any not yet pruned.
    #[must_use]
    pub fn recorded_calls(&self) -> usize {
        self.call_timestamps.len()
    }

    /// Check whether a new call is currently allowed.
    ///
    /// Prunes timestamps older than one hour as a side effect, whatever the
    /// outcome.
    pub fn can_make_call(&mut self) -> bool {
        let now = self.clock.now_ms();
        match self.evaluate(now) {
            Verdict::Admit => true,
            Verdict::MinuteExhausted { calls, .. } => {
                warn!(
                    calls,
                    max = self.max_calls_per_minute,
                    "Rate limit: too many calls in the last minute"
                );
                false
            }
            Verdict::HourExhausted { calls } => {
                warn!(
                    calls,
                    max = self.max_calls_per_hour,
                    "Rate limit: too many calls in the last hour"
                );
                false
            }
        }
    }

    /// Record a call that was just made.
    ///
    /// Does not prune.
    pub fn record_call(&mut self) {
        let now = self.clock.now_ms();
        self.call_timestamps.push_back(now);
    }

    /// Milliseconds until the next call would be admitted, `0` if allowed now.
    ///
    /// When the minute quota is exhausted this is the time until the oldest
    /// call of the trailing minute leaves the window. When only the hourly
    /// quota is exhausted it is the flat [`HOURLY_FALLBACK_WAIT`].
    pub fn wait_time_ms(&mut self) -> u64 {
        let now = self.clock.now_ms();
        match self.evaluate(now) {
            Verdict::Admit => 0,
            Verdict::MinuteExhausted { earliest, .. } => {
                earliest.saturating_add(MINUTE_MS).saturating_sub(now)
            }
            Verdict::HourExhausted { .. } => HOURLY_FALLBACK_MS,
        }
    }

    /// Time until the next call would be admitted.
    pub fn wait_time(&mut self) -> Duration {
        Duration::from_millis(self.wait_time_ms())
    }

    /// Clear all recorded calls.
    pub fn reset(&mut self) {
        self.call_timestamps.clear();
    }

    /// Calls left before either horizon is exhausted.
    pub fn remaining(&mut self) -> u32 {
        let now = self.clock.now_ms();
        self.prune(now);
        let (minute_left, hour_left) = self.remaining_per_horizon(now);
        minute_left.min(hour_left)
    }

    /// Snapshot of the current admission state.
    pub fn state(&mut self) -> RateLimitState {
        let now = self.clock.now_ms();
        let reset_after_ms = match self.evaluate(now) {
            Verdict::Admit => 0,
            Verdict::MinuteExhausted { earliest, .. } => {
                earliest.saturating_add(MINUTE_MS).saturating_sub(now)
            }
            Verdict::HourExhausted { .. } => HOURLY_FALLBACK_MS,
        };

        let (minute_left, hour_left) = self.remaining_per_horizon(now);
        let (limit, remaining) = if minute_left <= hour_left {
            (self.max_calls_per_minute, minute_left)
        } else {
            (self.max_calls_per_hour, hour_left)
        };

        RateLimitState {
            limit,
            remaining,
            reset_after: Duration::from_millis(reset_after_ms),
            is_limited: reset_after_ms > 0,
        }
    }

    fn evaluate(&mut self, now: u64) -> Verdict {
        self.prune(now);

        let (calls, earliest) = self.minute_window(now);
        if calls >= self.max_calls_per_minute as usize {
            return Verdict::MinuteExhausted {
                calls,
                earliest: earliest.unwrap_or(now),
            };
        }

        let calls = self.call_timestamps.len();
        if calls >= self.max_calls_per_hour as usize {
            return Verdict::HourExhausted { calls };
        }

        Verdict::Admit
    }

    /// Drop every timestamp that is not within the trailing hour.
    fn prune(&mut self, now: u64) {
        self.call_timestamps.retain(|&at| now.saturating_sub(at) < HOUR_MS);
    }

    /// Count and earliest instant of the calls within the trailing minute.
    fn minute_window(&self, now: u64) -> (usize, Option<u64>) {
        self.call_timestamps
            .iter()
            .copied()
            .filter(|&at| now.saturating_sub(at) < MINUTE_MS)
            .fold((0, None), |(count, earliest), at| {
                (count + 1, Some(earliest.map_or(at, |e: u64| e.min(at))))
            })
    }

    fn remaining_per_horizon(&self, now: u64) -> (u32, u32) {
        let (in_minute, _) = self.minute_window(now);
        let in_minute = u32::try_from(in_minute).unwrap_or(u32::MAX);
        let in_hour = u32::try_from(self.call_timestamps.len()).unwrap_or(u32::MAX);
        (
            self.max_calls_per_minute.saturating_sub(in_minute),
            self.max_calls_per_hour.saturating_sub(in_hour),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockClock;

    fn limiter_at(
        per_minute: u32,
        per_hour: u32,
        start_ms: u64,
    ) -> (CallAdmissionLimiter<MockClock>, MockClock) {
        let clock = MockClock::new(start_ms);
        (
            CallAdmissionLimiter::with_clock(per_minute, per_hour, clock.clone()),
            clock,
        )
    }

    #[test]
    fn test_empty_limiter_admits() {
        let (mut limiter, _) = limiter_at(10, 100, 0);
        assert!(limiter.can_make_call());
        assert_eq!(limiter.wait_time_ms(), 0);
    }

    #[test]
    fn test_window_recovery() {
        let (mut limiter, clock) = limiter_at(2, 100, 0);

        limiter.record_call();
        clock.set(100);
        limiter.record_call();

        assert!(!limiter.can_make_call());
        assert_eq!(limiter.wait_time_ms(), 59_900);

        clock.set(60_001);
        assert!(limiter.can_make_call());
        assert_eq!(limiter.wait_time_ms(), 0);
    }

    #[test]
    fn test_minute_boundary_is_exclusive() {
        let (mut limiter, clock) = limiter_at(1, 100, 0);
        limiter.record_call();

        clock.set(59_999);
        assert!(!limiter.can_make_call());
        assert_eq!(limiter.wait_time_ms(), 1);

        clock.set(60_000);
        assert!(limiter.can_make_call());
    }

    #[test]
    fn test_hourly_fallback_is_flat() {
        let (mut limiter, clock) = limiter_at(100, 1, 0);
        limiter.record_call();

        clock.set(1_000);
        assert!(!limiter.can_make_call());
        assert_eq!(limiter.wait_time_ms(), 60_000);
        assert_eq!(limiter.wait_time(), HOURLY_FALLBACK_WAIT);

        // Still flat well past the minute horizon.
        clock.set(3_000_000);
        assert_eq!(limiter.wait_time_ms(), 60_000);

        clock.set(3_600_000);
        assert!(limiter.can_make_call());
    }

    #[test]
    fn test_prune_is_permanent() {
        let (mut limiter, clock) = limiter_at(10, 100, 0);
        for _ in 0..5 {
            limiter.record_call();
            clock.advance(Duration::from_secs(1));
        }
        assert_eq!(limiter.recorded_calls(), 5);

        clock.set(HOUR_MS + 2_500);
        assert!(limiter.can_make_call());
        // Calls at 0, 1000 and 2000 are gone; 3000 and 4000 remain.
        assert_eq!(limiter.recorded_calls(), 2);

        clock.set(0);
        assert_eq!(limiter.recorded_calls(), 2);
    }

    #[test]
    fn test_record_call_does_not_prune() {
        let (mut limiter, clock) = limiter_at(10, 100, 0);
        limiter.record_call();
        clock.set(2 * HOUR_MS);
        limiter.record_call();
        assert_eq!(limiter.recorded_calls(), 2);
    }

    #[test]
    fn test_reset_clears_history() {
        let (mut limiter, _) = limiter_at(2, 3, 0);
        limiter.record_call();
        limiter.record_call();
        limiter.record_call();
        assert!(!limiter.can_make_call());

        limiter.reset();
        assert!(limiter.can_make_call());
        assert_eq!(limiter.wait_time_ms(), 0);
        assert_eq!(limiter.recorded_calls(), 0);
    }

    #[test]
    fn test_default_quotas() {
        let limiter = CallAdmissionLimiter::default();
        assert_eq!(limiter.max_calls_per_minute(), 10);
        assert_eq!(limiter.max_calls_per_hour(), 100);
    }

    #[test]
    fn test_from_config_rejects_zero() {
        assert!(CallAdmissionLimiter::from_config(&QuotaConfig::new(0, 1)).is_err());
        let limiter = CallAdmissionLimiter::from_config(&QuotaConfig::new(3, 30)).unwrap();
        assert_eq!(limiter.max_calls_per_minute(), 3);
        assert_eq!(limiter.max_calls_per_hour(), 30);
    }

    #[test]
    fn test_remaining_takes_tighter_horizon() {
        let (mut limiter, clock) = limiter_at(5, 7, 0);
        for _ in 0..4 {
            limiter.record_call();
        }
        assert_eq!(limiter.remaining(), 1);

        // Minute window clears, hour still holds 4 of 7.
        clock.set(MINUTE_MS);
        assert_eq!(limiter.remaining(), 3);
    }

    #[test]
    fn test_state_snapshot() {
        let (mut limiter, clock) = limiter_at(2, 100, 0);
        let state = limiter.state();
        assert_eq!(state.limit, 2);
        assert_eq!(state.remaining, 2);
        assert!(!state.is_limited);
        assert_eq!(state.reset_after, Duration::ZERO);

        limiter.record_call();
        limiter.record_call();
        clock.set(10_000);

        let state = limiter.state();
        assert!(state.is_limited);
        assert_eq!(state.remaining, 0);
        assert_eq!(state.reset_after, Duration::from_millis(50_000));
    }

    #[test]
    fn test_clock_regression_counts_future_calls() {
        let (mut limiter, clock) = limiter_at(1, 100, 10_000);
        limiter.record_call();

        clock.set(5_000);
        assert!(!limiter.can_make_call());
        assert_eq!(limiter.wait_time_ms(), 65_000);
    }
}
