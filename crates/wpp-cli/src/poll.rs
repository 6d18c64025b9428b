//! Remote command polling.
//!
//! The chat bot writes `pause` / `resume` / `status` rows into the command
//! queue; the poller applies them to the local control state, answers in the
//! chat and marks each row processed.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wpp_core::{BotStatus, CommandKind, CommandSource, Notifier, RemoteCommand, UserId};
use wpp_telegram::{Notification, notify};

/// Local publishing state controlled by remote commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlState {
    pub paused: bool,
    pub queue_length: u32,
    pub completed_count: u32,
    pub failed_count: u32,
    pub current_item: Option<String>,
}

impl ControlState {
    /// Status record as published for the chat bot.
    #[must_use]
    pub fn snapshot(&self) -> BotStatus {
        BotStatus {
            is_paused: self.paused,
            queue_length: self.queue_length,
            completed_count: self.completed_count,
            failed_count: self.failed_count,
            current_item: self.current_item.clone(),
        }
    }
}

/// Applies queued remote commands.
pub struct CommandPoller<S, N> {
    source: S,
    notifier: N,
    state: ControlState,
}

impl<S: CommandSource, N: Notifier> CommandPoller<S, N> {
    pub fn new(source: S, notifier: N) -> Self {
        Self {
            source,
            notifier,
            state: ControlState::default(),
        }
    }

    pub const fn state(&self) -> &ControlState {
        &self.state
    }

    /// Handle every pending command, oldest first. Returns how many were handled.
    pub async fn poll_once(&mut self, user_id: &UserId) -> usize {
        let commands = self.source.list_unprocessed(user_id).await;
        if !commands.is_empty() {
            debug!(count = commands.len(), "Handling remote commands");
        }

        for command in &commands {
            self.apply(user_id, command).await;
            self.source.mark_processed(&command.id).await;
        }

        commands.len()
    }

    /// Poll every `interval` until `cancel` fires.
    pub async fn run(&mut self, user_id: &UserId, interval: Duration, cancel: CancellationToken) {
        info!(user = %user_id, interval_ms = interval.as_millis(), "Command poller started");

        while !cancel.is_cancelled() {
            self.poll_once(user_id).await;

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(interval) => {}
            }
        }

        info!("Command poller stopped");
    }

    async fn apply(&mut self, user_id: &UserId, command: &RemoteCommand) {
        info!(id = %command.id, command = command.command.as_str(), "Remote command");

        match command.command {
            CommandKind::Pause => {
                self.state.paused = true;
                notify(&self.notifier, &Notification::Paused).await;
            }
            CommandKind::Resume => {
                self.state.paused = false;
                notify(&self.notifier, &Notification::Resumed).await;
            }
            CommandKind::Status => {
                let status = self.state.snapshot();
                self.source.publish_status(user_id, &status).await;
                notify(&self.notifier, &Notification::Status(status)).await;
            }
            CommandKind::Unknown => {
                warn!(id = %command.id, "Skipping unknown remote command");
            }
        }
    }
}
