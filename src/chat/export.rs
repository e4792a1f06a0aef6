//! Chat history export.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chat::errors::StoreResult;
use crate::chat::message::Message;

/// Snapshot of the conversation for download.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatExport {
    /// Messages at export time.
    pub messages: Vec<Message>,
    /// Time of export.
    pub export_date: DateTime<Utc>,
}

impl ChatExport {
    /// Snapshot `messages` stamped with the current time.
    #[must_use]
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            export_date: Utc::now(),
        }
    }

    /// `chat-history-YYYY-MM-DD.json` for the export date.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("chat-history-{}.json", self.export_date.format("%Y-%m-%d"))
    }

    /// Pretty-printed JSON with two-space indentation.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> StoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the export into `dir` under [`Self::file_name`].
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub async fn write_to_dir(&self, dir: &Path) -> StoreResult<PathBuf> {
        let path = dir.join(self.file_name());
        let json = self.to_json_pretty()?;
        tokio::fs::write(&path, json).await?;
        info!("Exported {} messages to {}", self.messages.len(), path.display());
        Ok(path)
    }
}
