//! Telegram Bot API client.
//!
//! Just the calls a notifier needs: `getMe` to verify the token and
//! `sendMessage` to deliver text.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument, warn};

use crate::types::{BotInfo, Message, SendMessageRequest, TelegramResponse};

const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// Telegram Bot API client.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    token: String,
    client: Client,
    base_url: String,
}

impl TelegramClient {
    /// Create a new Telegram client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client fails to build.
    pub fn new(token: impl Into<String>) -> Result<Self, TelegramError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(TelegramError::Http)?;

        Ok(Self {
            token: token.into(),
            client,
            base_url: DEFAULT_BASE_URL.into(),
        })
    }

    /// Set a custom base URL (for testing).
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Build the API URL for a method.
    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    /// Get bot information.
    #[instrument(skip(self))]
    pub async fn get_me(&self) -> Result<BotInfo, TelegramError> {
        let response: TelegramResponse<BotInfo> = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await?
            .json()
            .await?;

        into_result(response)
    }

    /// Send a text message.
    ///
    /// When a parse mode is set and Telegram rejects the markup, the message
    /// is sent once more as plain text.
    #[instrument(skip_all)]
    pub async fn send_message(
        &self,
        chat_id: &str,
        text: impl Into<String>,
        options: SendMessageOptions,
    ) -> Result<Message, TelegramError> {
        let request = SendMessageRequest {
            chat_id: normalize_chat_id(chat_id)?,
            text: text.into(),
            parse_mode: options.parse_mode,
        };

        let response = self.post_message(&request).await?;
        if response.ok {
            return into_result(response);
        }

        let desc = response.description.as_deref().unwrap_or("");
        if is_parse_error(desc) && request.parse_mode.is_some() {
            warn!("Parse mode error, retrying without formatting");
            let retry_request = SendMessageRequest {
                parse_mode: None,
                ..request
            };
            return into_result(self.post_message(&retry_request).await?);
        }

        into_result(response)
    }

    async fn post_message(
        &self,
        request: &SendMessageRequest,
    ) -> Result<TelegramResponse<Message>, TelegramError> {
        debug!(chat_id = %request.chat_id, len = request.text.len(), "sendMessage");
        Ok(self
            .client
            .post(self.api_url("sendMessage"))
            .json(request)
            .send()
            .await?
            .json()
            .await?)
    }
}

/// Convert the Bot API envelope into a result.
fn into_result<T>(response: TelegramResponse<T>) -> Result<T, TelegramError> {
    if response.ok {
        response.result.ok_or_else(|| TelegramError::Api {
            code: 0,
            description: "Empty result".into(),
        })
    } else {
        Err(TelegramError::Api {
            code: response.error_code.unwrap_or(0),
            description: response.description.unwrap_or_default(),
        })
    }
}

/// Options for sending messages.
#[derive(Debug, Default)]
pub struct SendMessageOptions {
    pub parse_mode: Option<String>,
}

impl SendMessageOptions {
    /// Use HTML parse mode.
    #[must_use]
    pub fn html(mut self) -> Self {
        self.parse_mode = Some("HTML".into());
        self
    }
}

/// Telegram API errors.
#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Telegram API error ({code}): {description}")]
    Api { code: i32, description: String },

    #[error("Invalid chat ID: {0}")]
    InvalidChatId(String),
}

impl TelegramError {
    /// Check if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            // 429 = rate limited, 500+ = server errors
            Self::Api { code, .. } => *code == 429 || *code >= 500,
            Self::InvalidChatId(_) => false,
        }
    }
}

/// Normalize chat ID, handling various formats.
pub(crate) fn normalize_chat_id(id: &str) -> Result<String, TelegramError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(TelegramError::InvalidChatId("Empty chat ID".into()));
    }

    let normalized = trimmed
        .strip_prefix("telegram:")
        .or_else(|| trimmed.strip_prefix("tg:"))
        .unwrap_or(trimmed);
    let normalized = normalized.strip_prefix("group:").unwrap_or(normalized);

    if let Some(username) = normalized
        .strip_prefix("https://t.me/")
        .or_else(|| normalized.strip_prefix("http://t.me/"))
        .or_else(|| normalized.strip_prefix("t.me/"))
    {
        if username.starts_with('+') {
            return Err(TelegramError::InvalidChatId(
                "Cannot use invite links as chat ID".into(),
            ));
        }
        return Ok(format!("@{username}"));
    }

    if normalized.starts_with('@') {
        return Ok(normalized.to_string());
    }

    // Group IDs are negative, e.g. "-100123456"
    let digits = normalized.strip_prefix('-').unwrap_or(normalized);
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        return Ok(normalized.to_string());
    }

    if normalized.len() >= 5 && normalized.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Ok(format!("@{normalized}"));
    }

    Err(TelegramError::InvalidChatId(format!(
        "Cannot parse chat ID: {trimmed}"
    )))
}

/// Check if an error message indicates a parse mode error.
fn is_parse_error(description: &str) -> bool {
    let lower = description.to_lowercase();
    lower.contains("can't parse entities")
        || lower.contains("parse entities")
        || lower.contains("find end of the entity")
}
