//! WPP Telegram - chat notifications for publishing progress
//!
//! - [`TelegramClient`]: minimal Bot API client (`getMe`, `sendMessage`)
//! - [`TelegramNotifier`]: a [`Notifier`](wpp_core::Notifier) for one chat
//! - [`GuardedNotifier`]: puts a shared call-admission quota in front of any notifier
//! - [`Notification`]: HTML renderings of publishing events
//!
//! # Example
//!
//! ```rust,ignore
//! use wpp_ratelimit::SharedAdmissionLimiter;
//! use wpp_telegram::{GuardedNotifier, Notification, TelegramConfig, TelegramNotifier, notify};
//!
//! let telegram = TelegramNotifier::from_config(&config)?;
//! let notifier = GuardedNotifier::new(telegram, SharedAdmissionLimiter::default());
//!
//! notify(&notifier, &Notification::BatchStarted { count: 12 }).await;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod client;
mod messages;
mod notifier;
pub mod types;

pub use client::{SendMessageOptions, TelegramClient, TelegramError};
pub use messages::*;
pub use notifier::*;
