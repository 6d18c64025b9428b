//! Settings sync through the `user_settings` table.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info, instrument};
use wpp_core::{Settings, SettingsStore, UserId};

use crate::client::check;
use crate::{CloudClient, CloudError};

const TABLE: &str = "user_settings";

#[derive(Debug, Deserialize)]
struct SettingsRow {
    settings: Option<Settings>,
}

impl CloudClient {
    /// Fetch the stored settings document.
    ///
    /// Returns `Ok(None)` when the user has no row yet.
    ///
    /// # Errors
    /// Returns the backend's rejection or a transport error.
    #[instrument(skip(self), fields(user = %user_id))]
    pub async fn try_load_settings(&self, user_id: &UserId) -> Result<Option<Settings>, CloudError> {
        let response = self
            .get(self.rest_url(TABLE))
            .query(&[
                ("select", "settings".to_string()),
                ("user_id", format!("eq.{user_id}")),
            ])
            .send()
            .await?;

        let rows: Vec<SettingsRow> = check(response).await?.json().await?;
        Ok(rows.into_iter().next().and_then(|row| row.settings))
    }

    /// Insert or replace the settings document, keyed on the user.
    ///
    /// # Errors
    /// Returns the backend's rejection or a transport error.
    #[instrument(skip(self, settings), fields(user = %user_id))]
    pub async fn try_save_settings(&self, user_id: &UserId, settings: &Settings) -> Result<(), CloudError> {
        let body = serde_json::json!({
            "user_id": user_id,
            "settings": settings,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let response = self
            .post(self.rest_url(TABLE))
            .query(&[("on_conflict", "user_id")])
            .header("Prefer", "resolution=merge-duplicates")
            .json(&body)
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for CloudClient {
    async fn load(&self, user_id: &UserId) -> Option<Settings> {
        match self.try_load_settings(user_id).await {
            Ok(Some(settings)) => {
                info!("Settings loaded from cloud");
                Some(settings)
            }
            Ok(None) => None,
            Err(e) => {
                error!(error = %e, "Failed to load settings from cloud");
                None
            }
        }
    }

    async fn save(&self, user_id: &UserId, settings: &Settings) -> bool {
        match self.try_save_settings(user_id, settings).await {
            Ok(()) => {
                info!("Settings saved to cloud");
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to save settings to cloud");
                false
            }
        }
    }
}
