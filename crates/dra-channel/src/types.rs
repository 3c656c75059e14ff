//! Telegram Bot API types for deserialization.
//!
//! These types model the subset of the `getUpdates` response needed to read
//! channel posts. Every post field is optional so that one odd entry does
//! not fail the whole batch.

use serde::Deserialize;

/// Wrapper for all Telegram Bot API responses.
///
/// Every API method returns `{ ok: bool, result?: T, description?: String }`.
/// When `ok` is `false`, `description` contains the error message.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

/// A single update from the `getUpdates` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Monotonically increasing update identifier.
    pub update_id: i64,
    /// Post published in a channel the bot administers.
    pub channel_post: Option<ChannelPost>,
}

impl Update {
    /// Text body of the channel post, if both are present.
    pub fn text(&self) -> Option<&str> {
        self.channel_post.as_ref().and_then(|p| p.text.as_deref())
    }
}

/// A post in a Telegram channel.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelPost {
    pub message_id: Option<i64>,
    pub chat: Option<Chat>,
    /// Text content; absent for photos, stickers, etc.
    pub text: Option<String>,
    /// Unix timestamp of when the post was published.
    pub date: Option<i64>,
}

/// The channel a post belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
    pub title: Option<String>,
}
