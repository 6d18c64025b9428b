//! Structured logging with JSON output and sensitive data redaction.

use serde_json::Value;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

use crate::{TelemetryConfig, TelemetryError};

/// Initialize the logging subsystem.
///
/// `RUST_LOG` wins over the configured level. Logs go to stderr so stdout
/// stays free for command output.
pub(crate) fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if config.json_logs {
        let json_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE);

        subscriber
            .with(json_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        let pretty_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true);

        subscriber
            .with(pretty_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    Ok(())
}

const REDACTED: &str = "[REDACTED]";

/// Mask credentials in a logged JSON payload.
///
/// A key is sensitive when it contains one of `fields`, ignoring ASCII case,
/// so `refresh_token` is caught by `token`. String values carrying a bearer
/// credential are masked whatever their key.
#[must_use]
pub fn redact_sensitive(value: &Value, fields: &[String]) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, val)| {
                    let masked = if is_sensitive_key(key, fields) {
                        Value::from(REDACTED)
                    } else {
                        redact_sensitive(val, fields)
                    };
                    (key.clone(), masked)
                })
                .collect(),
        ),
        Value::Array(items) => items.iter().map(|v| redact_sensitive(v, fields)).collect(),
        Value::String(s) if is_bearer(s) => Value::from(REDACTED),
        other => other.clone(),
    }
}

fn is_sensitive_key(key: &str, fields: &[String]) -> bool {
    let key = key.to_ascii_lowercase();
    fields.iter().any(|f| key.contains(&f.to_ascii_lowercase()))
}

fn is_bearer(value: &str) -> bool {
    value
        .get(..7)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("bearer "))
}
