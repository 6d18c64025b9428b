//! Notification senders.
//!
//! [`TelegramNotifier`] delivers text to one chat. [`GuardedNotifier`] puts a
//! shared call-admission limiter in front of any [`Notifier`].

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};
use wpp_core::Notifier;
use wpp_ratelimit::{Clock, RateLimitError, RateLimiter, SharedAdmissionLimiter, SystemClock};

use crate::client::{SendMessageOptions, TelegramClient, TelegramError};

/// Telegram notifier configuration.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct TelegramConfig {
    /// Bot token. Without it notifications are skipped.
    pub token: Option<String>,

    /// Target chat. Without it notifications are skipped.
    pub chat_id: Option<String>,

    /// Custom API base URL (optional)
    pub base_url: Option<String>,
}

/// Sends HTML notifications to a single Telegram chat.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    target: Option<(TelegramClient, String)>,
}

impl TelegramNotifier {
    /// Build a notifier from configuration.
    ///
    /// An incomplete configuration yields a notifier that skips every send.
    ///
    /// # Errors
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: &TelegramConfig) -> Result<Self, TelegramError> {
        let token = config.token.as_deref().filter(|t| !t.is_empty());
        let chat_id = config.chat_id.as_deref().filter(|c| !c.is_empty());
        let (Some(token), Some(chat_id)) = (token, chat_id) else {
            return Ok(Self::disabled());
        };

        let mut client = TelegramClient::new(token)?;
        if let Some(base_url) = &config.base_url {
            client = client.with_base_url(base_url);
        }

        Ok(Self {
            target: Some((client, chat_id.to_string())),
        })
    }

    /// A notifier that skips every send.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { target: None }
    }

    /// Whether a token and chat are configured.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.target.is_some()
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> bool {
        let Some((client, chat_id)) = &self.target else {
            warn!("Telegram not configured, skipping notification");
            return false;
        };

        match client
            .send_message(chat_id, text, SendMessageOptions::default().html())
            .await
        {
            Ok(message) => {
                info!(message_id = message.message_id, "Telegram notification sent");
                true
            }
            Err(e) => {
                error!(error = %e, retryable = e.is_retryable(), "Telegram notification failed");
                false
            }
        }
    }

    fn is_ready(&self) -> bool {
        self.is_configured()
    }
}

/// What a [`GuardedNotifier`] does when the limiter denies a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdmissionPolicy {
    /// Drop the notification.
    #[default]
    Drop,

    /// Wait for admission, dropping only if the wait would exceed `max_wait`.
    Wait { max_wait: Duration },
}

/// A notifier whose sends draw from a shared call-admission quota.
///
/// Admission and recording happen in one step before the send, so
/// concurrent senders cannot both take the last slot. A notifier that is not
/// configured is passed through without consuming quota.
pub struct GuardedNotifier<N, C = SystemClock> {
    inner: N,
    limiter: SharedAdmissionLimiter<C>,
    policy: AdmissionPolicy,
}

impl<N: Notifier, C: Clock> GuardedNotifier<N, C> {
    /// Guard `inner` with `limiter`, dropping denied sends.
    pub fn new(inner: N, limiter: SharedAdmissionLimiter<C>) -> Self {
        Self {
            inner,
            limiter,
            policy: AdmissionPolicy::Drop,
        }
    }

    /// Set the policy for denied sends.
    #[must_use]
    pub fn with_policy(mut self, policy: AdmissionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The limiter this notifier draws from.
    pub fn limiter(&self) -> &SharedAdmissionLimiter<C> {
        &self.limiter
    }

    async fn admit(&self) -> Result<(), RateLimitError> {
        match self.policy {
            AdmissionPolicy::Drop => self.limiter.try_admit(),
            AdmissionPolicy::Wait { max_wait } => {
                let waited = self.limiter.acquire(max_wait).await?;
                let waited_ms = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX);
                debug!(waited_ms, "Admitted after wait");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl<N: Notifier, C: Clock> Notifier for GuardedNotifier<N, C> {
    async fn send(&self, text: &str) -> bool {
        if !self.inner.is_ready() {
            return self.inner.send(text).await;
        }

        if let Err(e) = self.admit().await {
            warn!(error = %e, "Notification dropped by rate limit");
            return false;
        }

        self.inner.send(text).await
    }

    fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }
}
