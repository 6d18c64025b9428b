//! Password login against the hosted auth API.
//!
//! There is a single admin account. The first login with a fresh project
//! fails with "Invalid login credentials", in which case the account is
//! created with the same password.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use wpp_core::{AuthOutcome, AuthProvider, Identity, UserId};

use crate::client::check;
use crate::{CloudClient, CloudError};

const INVALID_CREDENTIALS: &str = "Invalid login credentials";

/// Shortest accepted admin password, in characters.
pub const MIN_PASSWORD_CHARS: usize = 6;

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Missing when sign-up succeeded but the account awaits confirmation.
    pub access_token: Option<String>,
    pub user: Identity,
}

/// Token and sign-up responses. Sign-up without auto-confirm returns the
/// bare user object instead of a session.
#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: Option<String>,
    user: Option<AuthUser>,
    id: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    email: Option<String>,
}

impl AuthResponse {
    fn into_session(self) -> Option<Session> {
        let user = match self.user {
            Some(user) => user,
            None => AuthUser {
                id: self.id?,
                email: self.email,
            },
        };

        Some(Session {
            access_token: self.access_token,
            user: Identity {
                id: UserId::new(user.id),
                email: user.email,
            },
        })
    }
}

impl CloudClient {
    /// Password grant for the admin account.
    ///
    /// # Errors
    /// Returns the backend's rejection or a transport error.
    #[instrument(skip_all)]
    pub async fn try_sign_in(&self, password: &str) -> Result<Session, CloudError> {
        let url = format!("{}?grant_type=password", self.auth_url("token"));
        self.credentials_request(url, password).await
    }

    /// Create the admin account.
    ///
    /// # Errors
    /// Returns the backend's rejection or a transport error.
    #[instrument(skip_all)]
    pub async fn try_sign_up(&self, password: &str) -> Result<Session, CloudError> {
        self.credentials_request(self.auth_url("signup"), password)
            .await
    }

    /// Revoke the current access token.
    ///
    /// # Errors
    /// Returns the backend's rejection or a transport error.
    #[instrument(skip_all)]
    pub async fn try_sign_out(&self) -> Result<(), CloudError> {
        let response = self.post(self.auth_url("logout")).send().await?;
        check(response).await?;
        Ok(())
    }

    async fn credentials_request(&self, url: String, password: &str) -> Result<Session, CloudError> {
        let body = serde_json::json!({
            "email": self.config.admin_email,
            "password": password,
        });
        debug!(%url, request = %wpp_telemetry::redact(&body), "Auth request");

        let response = self.post(url).json(&body).send().await?;
        let parsed: AuthResponse = check(response).await?.json().await?;
        parsed
            .into_session()
            .ok_or_else(|| CloudError::Decode("auth response carries no user".into()))
    }

    fn store_session(&self, session: Session) {
        *self.session.write() = Some(session);
    }
}

fn outcome_message(err: &CloudError) -> String {
    match err {
        CloudError::Api { message, .. } if !message.is_empty() => message.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl AuthProvider for CloudClient {
    async fn authenticate(&self, secret: &str) -> AuthOutcome {
        // Checked before any request: a failed first login signs up with this secret.
        if secret.chars().count() < MIN_PASSWORD_CHARS {
            warn!("Password too short, not contacting the backend");
            return AuthOutcome::failure(format!(
                "Password must be at least {MIN_PASSWORD_CHARS} characters"
            ));
        }

        match self.try_sign_in(secret).await {
            Ok(session) => {
                info!(user = %session.user.id, "Logged in");
                self.store_session(session);
                AuthOutcome::success()
            }
            Err(CloudError::Api { message, .. }) if message.contains(INVALID_CREDENTIALS) => {
                match self.try_sign_up(secret).await {
                    Ok(session) => {
                        info!(user = %session.user.id, "Admin account created and logged in");
                        self.store_session(session);
                        AuthOutcome::success()
                    }
                    Err(e) => {
                        warn!(error = %e, "Sign-up failed");
                        AuthOutcome::failure(outcome_message(&e))
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                AuthOutcome::failure(outcome_message(&e))
            }
        }
    }

    async fn end_session(&self) {
        let has_token = self
            .session
            .read()
            .as_ref()
            .is_some_and(|s| s.access_token.is_some());

        if has_token {
            if let Err(e) = self.try_sign_out().await {
                warn!(error = %e, "Logout request failed, clearing session locally");
            }
        }

        *self.session.write() = None;
        info!("Logged out");
    }

    /// The signed-in user. `None` until a session carries an access token,
    /// which a sign-up awaiting confirmation does not.
    async fn current_user(&self) -> Option<Identity> {
        self.session
            .read()
            .as_ref()
            .filter(|s| s.access_token.is_some())
            .map(|s| s.user.clone())
    }
}
