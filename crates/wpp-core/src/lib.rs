//! WPP Core - Shared types and collaborator traits
//!
//! This crate holds what the limiter-guarded call sites have in common:
//!
//! - Domain records exchanged with the hosted backend (commands, bot status)
//! - The collaborator traits every backend adapter implements
//!
//! Adapters never raise for expected failures: a failed notification is a
//! `false`, a missing settings row is `None`, an unreachable command table is
//! an empty list.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod collaborator;
mod types;

pub use collaborator::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use chrono::{DateTime, Utc};
