//! WPP Telemetry - structured logging for the publishing guard
//!
//! - **Structured Logging**: JSON or pretty `tracing` output, filtered by `RUST_LOG`
//! - **Redaction**: masks secrets in JSON payloads before they reach the logs
//! - **Test Output**: a once-only subscriber wired to the test writer
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use wpp_telemetry::{TelemetryConfig, init_telemetry};
//!
//! init_telemetry(TelemetryConfig::new("wpp").with_json_logs(false))?;
//!
//! tracing::info!(chat = "ops", "Starting up");
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod logging;
mod test_support;

pub use logging::*;
pub use test_support::*;

use std::sync::OnceLock;

/// Redaction list of the initialized subscriber.
static REDACT_FIELDS: OnceLock<Vec<String>> = OnceLock::new();

/// Configuration for telemetry initialization.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event.
    pub service_name: String,

    /// Log level filter (e.g., "info", "debug", "wpp_cloud=trace").
    pub log_level: String,

    /// Enable JSON log output.
    pub json_logs: bool,

    /// Fields to redact from logged payloads.
    pub redact_fields: Vec<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "wpp".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            redact_fields: default_redact_fields(),
        }
    }
}

impl TelemetryConfig {
    /// Create a new configuration with the given service name.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Set the log level.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable or disable JSON logs.
    #[must_use]
    pub const fn with_json_logs(mut self, enabled: bool) -> Self {
        self.json_logs = enabled;
        self
    }

    /// Add fields to redact from logs.
    #[must_use]
    pub fn with_redact_fields(mut self, fields: Vec<String>) -> Self {
        self.redact_fields.extend(fields);
        self
    }
}

/// Telemetry errors.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The global subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),
}

/// Initialize the logging subsystem.
///
/// Call once at startup. A second call fails because a global subscriber is
/// already installed.
///
/// # Errors
///
/// Returns an error if the subscriber cannot be installed.
pub fn init_telemetry(config: TelemetryConfig) -> Result<(), TelemetryError> {
    init_logging(&config)?;

    tracing::debug!(service = %config.service_name, json = config.json_logs, "Telemetry initialized");
    let _ = REDACT_FIELDS.set(config.redact_fields);

    Ok(())
}

/// Fields redacted by [`redact`]: the configured list, or the defaults before
/// initialization.
#[must_use]
pub fn redact_fields() -> &'static [String] {
    REDACT_FIELDS.get_or_init(default_redact_fields)
}

/// Redact a payload with the active field list.
#[must_use]
pub fn redact(value: &serde_json::Value) -> serde_json::Value {
    redact_sensitive(value, redact_fields())
}

fn default_redact_fields() -> Vec<String> {
    vec![
        "password".to_string(),
        "api_key".to_string(),
        "apikey".to_string(),
        "secret".to_string(),
        "token".to_string(),
        "authorization".to_string(),
    ]
}
