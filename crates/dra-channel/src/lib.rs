//! DRA Channel - Telegram channel polling
//!
//! Reads channel posts from the Telegram Bot API `getUpdates` endpoint.
//! The last seen update identifier is kept in a [`ChannelSession`], so
//! every caller (CLI run, web session) owns its own cursor.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use dra_core::{Result, UpdateId};

pub mod client;
pub mod session;
pub mod types;

pub use client::TelegramClient;
pub use session::{ChannelSession, FetchBatch, FetchOutcome};
pub use types::{ChannelPost, Update};

/// Trait for sources of channel updates
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Fetch updates starting at `offset` (inclusive), or the recent set
    /// when `offset` is `None`
    async fn get_updates(&self, offset: Option<UpdateId>) -> Result<Vec<Update>>;

    /// Get source name for logging
    fn name(&self) -> &str;
}
