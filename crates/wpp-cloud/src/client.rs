//! HTTP plumbing shared by the auth, settings and command adapters.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder, Response};

use crate::auth::Session;
use crate::{CloudConfig, CloudError};

/// Client for the hosted auth (`/auth/v1`) and table (`/rest/v1`) APIs.
///
/// Clones share the same session.
#[derive(Debug, Clone)]
pub struct CloudClient {
    pub(crate) config: CloudConfig,
    client: Client,
    pub(crate) session: Arc<RwLock<Option<Session>>>,
}

impl CloudClient {
    /// Create a new client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: CloudConfig) -> Result<Self, CloudError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(CloudError::Http)?;

        Ok(Self {
            config: CloudConfig {
                project_url: config.project_url.trim_end_matches('/').to_string(),
                ..config
            },
            client,
            session: Arc::new(RwLock::new(None)),
        })
    }

    /// The current session, if logged in.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    pub(crate) fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.config.project_url)
    }

    pub(crate) fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.config.project_url)
    }

    /// Bearer token: the session's access token, else the anon key.
    fn bearer(&self) -> String {
        self.session
            .read()
            .as_ref()
            .and_then(|s| s.access_token.clone())
            .unwrap_or_else(|| self.config.anon_key.clone())
    }

    /// Attach the API key and bearer token.
    pub(crate) fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.config.anon_key)
            .bearer_auth(self.bearer())
    }

    pub(crate) fn get(&self, url: String) -> RequestBuilder {
        self.authorized(self.client.get(url))
    }

    pub(crate) fn post(&self, url: String) -> RequestBuilder {
        self.authorized(self.client.post(url))
    }

    pub(crate) fn patch(&self, url: String) -> RequestBuilder {
        self.authorized(self.client.patch(url))
    }
}

/// Pass successful responses through, turn the rest into [`CloudError::Api`].
pub(crate) async fn check(response: Response) -> Result<Response, CloudError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(CloudError::Api {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Pull the human-readable message out of an auth or table error body.
pub(crate) fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };

    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(serde_json::Value::as_str))
        .map_or_else(|| body.trim().to_string(), str::to_string)
}
