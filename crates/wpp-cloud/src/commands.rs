//! Remote control queue (`remote_commands`) and status row (`bot_status`).

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, instrument, warn};
use wpp_core::{BotStatus, CommandSource, RemoteCommand, UserId};

use crate::client::check;
use crate::{CloudClient, CloudError};

const COMMANDS_TABLE: &str = "remote_commands";
const STATUS_TABLE: &str = "bot_status";

#[derive(Serialize)]
struct StatusRow<'a> {
    user_id: &'a UserId,
    #[serde(flatten)]
    status: &'a BotStatus,
    updated_at: String,
}

impl CloudClient {
    /// Unprocessed commands for the user, oldest first.
    ///
    /// # Errors
    /// Returns the backend's rejection or a transport error.
    #[instrument(skip(self), fields(user = %user_id))]
    pub async fn try_list_unprocessed(&self, user_id: &UserId) -> Result<Vec<RemoteCommand>, CloudError> {
        let response = self
            .get(self.rest_url(COMMANDS_TABLE))
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{user_id}")),
                ("processed", "eq.false".to_string()),
                ("order", "created_at.asc".to_string()),
            ])
            .send()
            .await?;

        let commands: Vec<RemoteCommand> = check(response).await?.json().await?;
        debug!(count = commands.len(), "Fetched pending commands");
        Ok(commands)
    }

    /// Flag one command as handled.
    ///
    /// # Errors
    /// Returns the backend's rejection or a transport error.
    #[instrument(skip(self))]
    pub async fn try_mark_processed(&self, command_id: &str) -> Result<(), CloudError> {
        let response = self
            .patch(self.rest_url(COMMANDS_TABLE))
            .query(&[("id", format!("eq.{command_id}"))])
            .json(&serde_json::json!({ "processed": true }))
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    /// Upsert the user's status row.
    ///
    /// # Errors
    /// Returns the backend's rejection or a transport error.
    #[instrument(skip(self, status), fields(user = %user_id))]
    pub async fn try_publish_status(&self, user_id: &UserId, status: &BotStatus) -> Result<(), CloudError> {
        let row = StatusRow {
            user_id,
            status,
            updated_at: Utc::now().to_rfc3339(),
        };

        let response = self
            .post(self.rest_url(STATUS_TABLE))
            .query(&[("on_conflict", "user_id")])
            .header("Prefer", "resolution=merge-duplicates")
            .json(&row)
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl CommandSource for CloudClient {
    async fn list_unprocessed(&self, user_id: &UserId) -> Vec<RemoteCommand> {
        self.try_list_unprocessed(user_id).await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to fetch pending commands");
            Vec::new()
        })
    }

    async fn mark_processed(&self, command_id: &str) {
        if let Err(e) = self.try_mark_processed(command_id).await {
            warn!(command_id, error = %e, "Failed to mark command processed");
        }
    }

    async fn publish_status(&self, user_id: &UserId, status: &BotStatus) {
        if let Err(e) = self.try_publish_status(user_id, status).await {
            error!(error = %e, "Failed to publish bot status");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_row_is_flat() {
        let user_id = UserId::new("u-1");
        let status = BotStatus {
            is_paused: true,
            queue_length: 4,
            completed_count: 2,
            failed_count: 1,
            current_item: Some("Post A".into()),
        };
        let row = StatusRow {
            user_id: &user_id,
            status: &status,
            updated_at: "2026-03-01T10:00:00+00:00".into(),
        };

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["user_id"], "u-1");
        assert_eq!(json["isPaused"], true);
        assert_eq!(json["queueLength"], 4);
        assert_eq!(json["completedCount"], 2);
        assert_eq!(json["failedCount"], 1);
        assert_eq!(json["currentItem"], "Post A");
        assert!(json.get("updated_at").is_some());
        assert!(json.get("is_paused").is_none());
        assert!(json.get("status").is_none());
    }
}
