//! HTTP client wrapper for the Telegram Bot API.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use dra_core::{DraError, HttpConfig, Result, TelegramConfig, UpdateId};
use reqwest::Client;
use tracing::{debug, trace};

use crate::types::{TelegramResponse, Update};
use crate::UpdateSource;

/// HTTP client for the Telegram Bot API.
///
/// The bot token is part of every request path and is never logged.
pub struct TelegramClient {
    http: Client,
    token: String,
    base_url: String,
}

impl TelegramClient {
    /// Create a client against the public Telegram API
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            token: token.into(),
            base_url: TelegramConfig::default().base_url,
        }
    }

    /// Create from config
    pub fn from_config(
        token: impl Into<String>,
        telegram: &TelegramConfig,
        http: &HttpConfig,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(http.timeout())
            .build()
            .map_err(|e| DraError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http: client,
            token: token.into(),
            base_url: telegram.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Set custom base URL (for testing or a self-hosted Bot API server)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.base_url, self.token)
    }
}

#[async_trait]
impl UpdateSource for TelegramClient {
    async fn get_updates(&self, offset: Option<UpdateId>) -> Result<Vec<Update>> {
        let mut request = self.http.get(self.method_url("getUpdates"));
        if let Some(offset) = offset {
            request = request.query(&[("offset", offset)]);
        }

        trace!(offset = ?offset, "polling for updates");

        let response = request
            .send()
            .await
            .map_err(|e| DraError::Transport(format!("Telegram request failed: {}", e.without_url())))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DraError::Transport(format!("Failed to read Telegram response: {}", e.without_url())))?;

        let parsed: TelegramResponse<Vec<Update>> = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) if status.is_success() => {
                return Err(DraError::MalformedResponse(format!(
                    "Failed to parse Telegram response: {e}"
                )))
            }
            Err(_) => {
                return Err(DraError::Transport(format!("Telegram returned HTTP {status}")))
            }
        };

        if !parsed.ok {
            let desc = parsed
                .description
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(DraError::Transport(format!("Telegram API error: {desc}")));
        }

        let updates = parsed.result.ok_or_else(|| {
            DraError::MalformedResponse("Telegram response is missing `result`".to_string())
        })?;

        debug!(count = updates.len(), "received updates");
        Ok(updates)
    }

    fn name(&self) -> &str {
        "telegram"
    }
}
