//! Per-session fetch state
//!
//! Author: hephaex@gmail.com

use std::sync::Arc;

use dra_core::{DraError, Result, UpdateId};
use tracing::{debug, info, warn};

use crate::UpdateSource;

/// Texts read by one successful fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchBatch {
    /// Post texts in update order
    pub texts: Vec<String>,
    /// Cursor after this fetch
    pub cursor: Option<UpdateId>,
    /// Updates that carried no channel post text
    pub skipped: usize,
}

/// Result of a fetch with upstream failures folded in
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub texts: Vec<String>,
    pub cursor: Option<UpdateId>,
    pub skipped: usize,
    /// Set when the fetch failed; `texts` is then empty and the cursor
    /// is the one the session had before the call
    pub failure: Option<DraError>,
}

impl FetchOutcome {
    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// Channel polling session owning the last-seen update cursor
pub struct ChannelSession {
    source: Arc<dyn UpdateSource>,
    cursor: Option<UpdateId>,
}

impl ChannelSession {
    /// Create a session with an empty cursor
    pub fn new(source: Arc<dyn UpdateSource>) -> Self {
        Self {
            source,
            cursor: None,
        }
    }

    /// Resume from a known cursor
    pub fn with_cursor(mut self, cursor: UpdateId) -> Self {
        self.cursor = Some(cursor);
        self
    }

    /// Last seen update identifier
    pub fn cursor(&self) -> Option<UpdateId> {
        self.cursor
    }

    /// Fetch new channel post texts, propagating upstream failures.
    ///
    /// Without a cursor the recent update set is requested; otherwise only
    /// updates strictly after the cursor. The cursor advances to the most
    /// recent update id only when the call succeeds with updates.
    pub async fn try_fetch(&mut self) -> Result<FetchBatch> {
        let offset = self.cursor.map(|c| c + 1);
        let updates = self.source.get_updates(offset).await?;

        let Some(latest) = updates.iter().map(|u| u.update_id).max() else {
            if self.cursor.is_none() {
                warn!(
                    source = self.source.name(),
                    "No updates returned; make sure the bot token is correct and the bot is a channel administrator"
                );
            } else {
                debug!(cursor = ?self.cursor, "no new updates");
            }
            return Ok(FetchBatch {
                texts: Vec::new(),
                cursor: self.cursor,
                skipped: 0,
            });
        };

        let mut texts = Vec::with_capacity(updates.len());
        let mut skipped = 0;
        for update in &updates {
            match update.text() {
                Some(text) => texts.push(text.to_string()),
                None => {
                    skipped += 1;
                    debug!(update_id = update.update_id, "update has no channel post text");
                }
            }
        }

        self.cursor = Some(latest);
        info!(
            fetched = texts.len(),
            skipped,
            cursor = latest,
            "fetched channel posts"
        );

        Ok(FetchBatch {
            texts,
            cursor: self.cursor,
            skipped,
        })
    }

    /// Fetch new channel post texts, degrading failures to an empty batch.
    pub async fn fetch(&mut self) -> FetchOutcome {
        match self.try_fetch().await {
            Ok(batch) => FetchOutcome {
                texts: batch.texts,
                cursor: batch.cursor,
                skipped: batch.skipped,
                failure: None,
            },
            Err(e) => {
                warn!(error = %e, cursor = ?self.cursor, "channel fetch failed");
                FetchOutcome {
                    texts: Vec::new(),
                    cursor: self.cursor,
                    skipped: 0,
                    failure: Some(e),
                }
            }
        }
    }
}
