//! Shared admission limiter for concurrent callers.
//!
//! Wraps a [`CallAdmissionLimiter`] so the check and the record happen in one
//! critical section, which two independent calls cannot guarantee.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::sleep;
use tracing::debug;

use crate::{
    CallAdmissionLimiter, Clock, QuotaConfig, RateLimitError, RateLimitState, RateLimiter,
    SystemClock,
};

/// Cloneable handle to one admission limiter.
///
/// All clones draw from the same quota. Build one per external credential
/// and pass it to every component that calls that API.
pub struct SharedAdmissionLimiter<C = SystemClock> {
    inner: Arc<Mutex<CallAdmissionLimiter<C>>>,
}

impl<C> Clone for SharedAdmissionLimiter<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl SharedAdmissionLimiter<SystemClock> {
    /// Create a shared limiter over the wall clock.
    #[must_use]
    pub fn new(max_calls_per_minute: u32, max_calls_per_hour: u32) -> Self {
        Self::from_limiter(CallAdmissionLimiter::new(
            max_calls_per_minute,
            max_calls_per_hour,
        ))
    }

    /// Create from a validated configuration.
    ///
    /// # Errors
    /// Returns [`RateLimitError::InvalidConfig`] if a quota is zero.
    pub fn from_config(config: &QuotaConfig) -> Result<Self, RateLimitError> {
        CallAdmissionLimiter::from_config(config).map(Self::from_limiter)
    }
}

impl Default for SharedAdmissionLimiter<SystemClock> {
    fn default() -> Self {
        Self::from_limiter(CallAdmissionLimiter::default())
    }
}

impl<C: Clock> SharedAdmissionLimiter<C> {
    /// Share an existing limiter.
    #[must_use]
    pub fn from_limiter(limiter: CallAdmissionLimiter<C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(limiter)),
        }
    }

    /// Check whether a call is currently allowed, without recording one.
    pub fn can_make_call(&self) -> bool {
        self.inner.lock().can_make_call()
    }

    /// Record a call made after a separate [`can_make_call`](Self::can_make_call).
    pub fn record_call(&self) {
        self.inner.lock().record_call();
    }

    /// Check and, when admitted, record a call under a single lock.
    pub fn check_and_record(&self) -> bool {
        let mut limiter = self.inner.lock();
        if limiter.can_make_call() {
            limiter.record_call();
            true
        } else {
            false
        }
    }

    /// Like [`check_and_record`](Self::check_and_record), but a denial
    /// carries the wait, computed under the same lock.
    ///
    /// # Errors
    /// Returns [`RateLimitError::Exceeded`] when the call is denied.
    pub fn try_admit(&self) -> Result<(), RateLimitError> {
        let mut limiter = self.inner.lock();
        if limiter.can_make_call() {
            limiter.record_call();
            Ok(())
        } else {
            Err(RateLimitError::Exceeded {
                retry_after: limiter.wait_time(),
            })
        }
    }

    /// Milliseconds until the next call would be admitted.
    pub fn wait_time_ms(&self) -> u64 {
        self.inner.lock().wait_time_ms()
    }

    /// Run a closure against the locked limiter.
    pub fn with_limiter<R>(&self, f: impl FnOnce(&mut CallAdmissionLimiter<C>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

#[async_trait]
impl<C: Clock> RateLimiter for SharedAdmissionLimiter<C> {
    async fn try_acquire(&self) -> bool {
        self.check_and_record()
    }

    async fn acquire(&self, max_wait: Duration) -> Result<Duration, RateLimitError> {
        let start = Instant::now();

        loop {
            if self.check_and_record() {
                return Ok(start.elapsed());
            }

            let wait_ms = self.wait_time_ms();
            let wait_time = Duration::from_millis(wait_ms);
            let total_waited = start.elapsed();

            if total_waited + wait_time > max_wait {
                return Err(RateLimitError::WaitExceeded {
                    wait_time: total_waited + wait_time,
                    max_wait,
                });
            }

            debug!(wait_ms, "Waiting for admission");
            sleep(wait_time).await;
        }
    }

    fn remaining(&self) -> u32 {
        self.inner.lock().remaining()
    }

    async fn wait_time(&self) -> Duration {
        self.inner.lock().wait_time()
    }

    async fn reset(&self) {
        self.inner.lock().reset();
    }

    fn state(&self) -> RateLimitState {
        self.inner.lock().state()
    }
}
