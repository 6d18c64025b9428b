//! wp-please operator CLI entrypoint.
//!
//! - `wpp login` - Log in (or create) the admin account
//! - `wpp notify` - Send one chat notification
//! - `wpp poll` - Apply remote chat commands until Ctrl-C
//! - `wpp settings` - Pull or push the settings document

#![forbid(unsafe_code)]

mod poll;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;
use wpp_cloud::{CloudClient, CloudConfig, DEFAULT_ADMIN_EMAIL};
use wpp_core::{AuthProvider, Identity, Notifier, SettingsStore};
use wpp_ratelimit::{
    DEFAULT_CALLS_PER_HOUR, DEFAULT_CALLS_PER_MINUTE, QuotaConfig, SharedAdmissionLimiter,
};
use wpp_telegram::{GuardedNotifier, TelegramConfig, TelegramNotifier};
use wpp_telemetry::{TelemetryConfig, init_telemetry};

use poll::CommandPoller;

/// wp-please operator CLI.
#[derive(Parser)]
#[command(name = "wpp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Emit JSON logs.
    #[arg(long, env = "WPP_LOG_JSON", global = true)]
    log_json: bool,

    #[command(flatten)]
    quota: QuotaArgs,

    #[command(flatten)]
    telegram: TelegramArgs,

    #[command(flatten)]
    cloud: CloudArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct QuotaArgs {
    /// Notifications allowed per sliding minute.
    #[arg(long, env = "WPP_RATE_PER_MINUTE", default_value_t = DEFAULT_CALLS_PER_MINUTE, global = true)]
    rate_per_minute: u32,

    /// Notifications allowed per sliding hour.
    #[arg(long, env = "WPP_RATE_PER_HOUR", default_value_t = DEFAULT_CALLS_PER_HOUR, global = true)]
    rate_per_hour: u32,
}

#[derive(Args)]
struct TelegramArgs {
    /// Telegram bot token.
    #[arg(long, env = "WPP_TELEGRAM_BOT_TOKEN", hide_env_values = true, global = true)]
    telegram_bot_token: Option<String>,

    /// Target chat id or @channel.
    #[arg(long, env = "WPP_TELEGRAM_CHAT_ID", global = true)]
    telegram_chat_id: Option<String>,
}

#[derive(Args)]
struct CloudArgs {
    /// Hosted backend project URL.
    #[arg(long, env = "WPP_SUPABASE_URL", global = true)]
    supabase_url: Option<String>,

    /// Public API key of the backend project.
    #[arg(long, env = "WPP_SUPABASE_ANON_KEY", hide_env_values = true, global = true)]
    supabase_anon_key: Option<String>,

    /// Admin account e-mail.
    #[arg(long, default_value = DEFAULT_ADMIN_EMAIL, global = true)]
    admin_email: String,

    /// Admin account password.
    #[arg(long, env = "WPP_ADMIN_PASSWORD", hide_env_values = true, global = true)]
    admin_password: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with the admin password.
    ///
    /// The account is created on first use.
    Login,

    /// Send one notification.
    ///
    /// Text may use Telegram HTML markup. The rate limit lives in this
    /// process only, so a single notify is never throttled; `poll` is where
    /// the quota applies across messages.
    Notify {
        /// Message text.
        text: String,
    },

    /// Apply remote pause/resume/status commands until Ctrl-C.
    Poll {
        /// Seconds between queue checks.
        #[arg(long, default_value_t = 10)]
        interval_secs: u64,
    },

    /// Sync the settings document.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Download the stored settings into a JSON file.
    Pull { file: PathBuf },

    /// Upload a JSON file as the stored settings.
    Push { file: PathBuf },
}

impl QuotaArgs {
    const fn config(&self) -> QuotaConfig {
        QuotaConfig::new(self.rate_per_minute, self.rate_per_hour)
    }
}

impl TelegramArgs {
    fn config(&self) -> TelegramConfig {
        TelegramConfig {
            token: self.telegram_bot_token.clone(),
            chat_id: self.telegram_chat_id.clone(),
            base_url: None,
        }
    }
}

impl CloudArgs {
    fn config(&self) -> Result<CloudConfig> {
        let url = self
            .supabase_url
            .as_deref()
            .context("WPP_SUPABASE_URL is not set")?;
        let anon_key = self
            .supabase_anon_key
            .as_deref()
            .context("WPP_SUPABASE_ANON_KEY is not set")?;

        Ok(CloudConfig {
            admin_email: self.admin_email.clone(),
            ..CloudConfig::new(url, anon_key)
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for settings output.
    init_telemetry(TelemetryConfig::new("wpp").with_json_logs(cli.log_json))?;

    // One limiter for every notification sent by this process; it only
    // throttles within a run, so it matters for `poll`.
    let limiter = SharedAdmissionLimiter::from_config(&cli.quota.config())?;
    let notifier = GuardedNotifier::new(TelegramNotifier::from_config(&cli.telegram.config())?, limiter);

    match cli.command {
        Commands::Login => {
            let (_, user) = login(&cli.cloud).await?;
            println!("Logged in as {}", user.email.as_deref().unwrap_or(user.id.as_str()));
            Ok(())
        }
        Commands::Notify { text } => {
            if !notifier.is_ready() {
                bail!("Telegram is not configured (WPP_TELEGRAM_BOT_TOKEN / WPP_TELEGRAM_CHAT_ID)");
            }
            if !notifier.send(&text).await {
                bail!("notification was not delivered");
            }
            Ok(())
        }
        Commands::Poll { interval_secs } => {
            let (client, user) = login(&cli.cloud).await?;
            let cancel = CancellationToken::new();

            let shutdown = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Shutdown requested");
                    shutdown.cancel();
                }
            });

            let mut poller = CommandPoller::new(client.clone(), notifier);
            poller
                .run(&user.id, Duration::from_secs(interval_secs), cancel)
                .await;
            info!(paused = poller.state().paused, "Poller finished");

            client.end_session().await;
            Ok(())
        }
        Commands::Settings { action } => {
            let (client, user) = login(&cli.cloud).await?;
            let result = sync_settings(&client, &user, action).await;
            client.end_session().await;
            result
        }
    }
}

async fn login(args: &CloudArgs) -> Result<(CloudClient, Identity)> {
    let client = CloudClient::new(args.config()?)?;
    let password = args
        .admin_password
        .as_deref()
        .context("WPP_ADMIN_PASSWORD is not set")?;

    let outcome = client.authenticate(password).await;
    if !outcome.ok {
        bail!(
            "login failed: {}",
            outcome.error_message.unwrap_or_else(|| "unknown error".into())
        );
    }

    let user = client
        .current_user()
        .await
        .context("account created but has no session yet (e-mail confirmation pending?)")?;
    Ok((client, user))
}

async fn sync_settings(client: &CloudClient, user: &Identity, action: SettingsAction) -> Result<()> {
    match action {
        SettingsAction::Pull { file } => {
            let Some(settings) = client.load(&user.id).await else {
                bail!("no settings stored for this account");
            };
            let text = serde_json::to_string_pretty(&settings)?;
            std::fs::write(&file, text)
                .with_context(|| format!("failed to write {}", file.display()))?;
            println!("Settings written to {}", file.display());
        }
        SettingsAction::Push { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let settings: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("{} is not valid JSON", file.display()))?;
            if !client.save(&user.id, &settings).await {
                bail!("settings upload failed");
            }
            println!("Settings uploaded from {}", file.display());
        }
    }
    Ok(())
}
