//! WPP Cloud - adapters for the hosted auth and database service
//!
//! One [`CloudClient`] implements every backend collaborator:
//!
//! - [`AuthProvider`](wpp_core::AuthProvider): password login for the single admin account
//! - [`SettingsStore`](wpp_core::SettingsStore): per-user settings documents
//! - [`CommandSource`](wpp_core::CommandSource): the chat bot's command queue and status row
//!
//! The trait methods never fail; each has a `try_*` counterpart returning
//! [`CloudError`] for callers that want the cause.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod auth;
mod client;
mod commands;
mod settings;

pub use auth::{MIN_PASSWORD_CHARS, Session};
pub use client::CloudClient;

/// Account every password login is made against.
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@wp-please.local";

/// Hosted backend configuration.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CloudConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`.
    pub project_url: String,

    /// Public (anon) API key.
    pub anon_key: String,

    /// Login e-mail of the admin account.
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
}

fn default_admin_email() -> String {
    DEFAULT_ADMIN_EMAIL.to_string()
}

impl CloudConfig {
    /// Create a configuration for the default admin account.
    #[must_use]
    pub fn new(project_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            project_url: project_url.into(),
            anon_key: anon_key.into(),
            admin_email: default_admin_email(),
        }
    }
}

/// Backend errors.
#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl CloudError {
    /// Check if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Decode(_) => false,
        }
    }
}
