//! Domain records shared between adapters.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backend user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap a raw identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

/// Application settings document.
///
/// Stored and synced as an opaque JSON value.
pub type Settings = serde_json::Value;

/// Result of an authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthOutcome {
    pub ok: bool,
    pub error_message: Option<String>,
}

impl AuthOutcome {
    /// Successful authentication.
    #[must_use]
    pub const fn success() -> Self {
        Self {
            ok: true,
            error_message: None,
        }
    }

    /// Failed authentication with a reason.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error_message: Some(message.into()),
        }
    }
}

/// Kind of a remote control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Pause,
    Resume,
    Status,
    #[serde(other)]
    Unknown,
}

impl CommandKind {
    /// Wire name of the command.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Status => "status",
            Self::Unknown => "unknown",
        }
    }
}

/// A command queued by the chat bot for the publishing client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCommand {
    pub id: String,
    pub command: CommandKind,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub processed: bool,
}

/// Progress snapshot published for the chat bot.
///
/// Field names are camelCase on the wire, as the bot reads them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotStatus {
    pub is_paused: bool,
    pub queue_length: u32,
    pub completed_count: u32,
    pub failed_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_item: Option<String>,
}
