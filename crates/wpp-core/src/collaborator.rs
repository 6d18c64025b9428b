//! Collaborator traits implemented by the backend adapters.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{AuthOutcome, BotStatus, Identity, RemoteCommand, Settings, UserId};

/// Password-gated session against the hosted auth service.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Log in with the shared secret, creating the account on first use.
    async fn authenticate(&self, secret: &str) -> AuthOutcome;

    /// End the current session. Never fails; local state is always cleared.
    async fn end_session(&self);

    /// The signed-in user, if any.
    async fn current_user(&self) -> Option<Identity>;
}

/// Per-user settings persisted in the hosted database.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Load settings; `None` when there is no row or the load failed.
    async fn load(&self, user_id: &UserId) -> Option<Settings>;

    /// Upsert settings; `false` when the write failed.
    async fn save(&self, user_id: &UserId, settings: &Settings) -> bool;
}

/// Remote control queue written by the chat bot.
#[async_trait]
pub trait CommandSource: Send + Sync {
    /// Unprocessed commands, oldest first. Empty on failure.
    async fn list_unprocessed(&self, user_id: &UserId) -> Vec<RemoteCommand>;

    /// Flag a command as handled.
    async fn mark_processed(&self, command_id: &str);

    /// Publish the current progress snapshot.
    async fn publish_status(&self, user_id: &UserId, status: &BotStatus);
}

/// Outbound chat notification.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a message; `false` when it was skipped or failed.
    async fn send(&self, text: &str) -> bool;

    /// Whether sends can reach the service at all.
    ///
    /// A notifier missing its credentials reports `false` and skips every
    /// send.
    fn is_ready(&self) -> bool {
        true
    }
}

#[async_trait]
impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    async fn send(&self, text: &str) -> bool {
        (**self).send(text).await
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}
