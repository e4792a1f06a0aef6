//! Persistence of the chat log as a single versioned blob.
//!
//! Blob layout: `{"version": 1, "state": {"messages": [...]}}`. A missing
//! version reads as `0`, which shares the message-list shape. Blobs from an
//! unknown version or that fail to parse load as an empty log; they never
//! raise.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::Utc;
use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_rusqlite::Connection;
use tracing::warn;

use crate::chat::errors::StoreResult;
use crate::chat::message::Message;
use crate::config::StorageConfig;

/// Schema version written by this crate.
pub const SCHEMA_VERSION: u32 = 1;

/// Boxed future type for persister operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Serialize, Deserialize)]
struct PersistedChat {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    state: PersistedState,
}

#[derive(Default, Serialize, Deserialize)]
struct PersistedState {
    #[serde(default)]
    messages: Vec<Message>,
}

/// Serialize a message list into a versioned blob.
///
/// # Errors
/// Returns an error if serialization fails.
pub fn encode_blob(messages: &[Message]) -> StoreResult<String> {
    let blob = PersistedChat {
        version: SCHEMA_VERSION,
        state: PersistedState {
            messages: messages.to_vec(),
        },
    };
    Ok(serde_json::to_string(&blob)?)
}

/// Decode a versioned blob. Anything unreadable yields an empty log.
#[must_use]
pub fn decode_blob(blob: &str) -> Vec<Message> {
    let parsed: PersistedChat = match serde_json::from_str(blob) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!("Discarding unreadable chat blob: {err}");
            return Vec::new();
        }
    };

    match parsed.version {
        0 | SCHEMA_VERSION => parsed.state.messages,
        other => {
            warn!("Discarding chat blob with unknown schema version {other}");
            Vec::new()
        }
    }
}

/// Durable storage for the message log.
pub trait StatePersister: Send + Sync {
    /// Load the persisted message log, empty if nothing was stored.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn load(&self) -> StoreFuture<'_, StoreResult<Vec<Message>>>;

    /// Replace the persisted message log.
    ///
    /// # Errors
    /// Returns an error if serialization or storage access fails.
    fn save(&self, messages: Vec<Message>) -> StoreFuture<'_, StoreResult<()>>;
}

/// In-process persister holding the encoded blob.
#[derive(Default)]
pub struct MemoryPersister {
    blob: Mutex<Option<String>>,
}

impl MemoryPersister {
    /// Create an empty persister.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a persister pre-seeded with a raw blob.
    #[must_use]
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Mutex::new(Some(blob.into())),
        }
    }

    /// Current raw blob, if any.
    pub async fn raw(&self) -> Option<String> {
        self.blob.lock().await.clone()
    }
}

impl StatePersister for MemoryPersister {
    fn load(&self) -> StoreFuture<'_, StoreResult<Vec<Message>>> {
        Box::pin(async move {
            let blob = self.blob.lock().await;
            Ok(blob.as_deref().map(decode_blob).unwrap_or_default())
        })
    }

    fn save(&self, messages: Vec<Message>) -> StoreFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let encoded = encode_blob(&messages)?;
            *self.blob.lock().await = Some(encoded);
            Ok(())
        })
    }
}

/// `SQLite` persister storing one named blob per row.
pub struct SqlitePersister {
    conn: Arc<Connection>,
    table: String,
    name: String,
}

impl SqlitePersister {
    /// Table name for chat blobs.
    pub const DEFAULT_TABLE: &'static str = "chat_storage";

    /// Open the database at the configured path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub async fn open(config: &StorageConfig) -> StoreResult<Self> {
        let conn = Connection::open(&config.sqlite_path).await?;
        Self::with_connection(Arc::new(conn), &config.store_name).await
    }

    /// Initialize on an existing connection and create the table if needed.
    ///
    /// # Errors
    /// Returns an error if database operations fail.
    pub async fn with_connection(conn: Arc<Connection>, name: &str) -> StoreResult<Self> {
        let table = Self::DEFAULT_TABLE.to_string();
        let table_name = table.clone();

        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    name TEXT PRIMARY KEY,
                    version INTEGER NOT NULL,
                    blob TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                );"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self {
            conn,
            table,
            name: name.to_string(),
        })
    }
}

impl StatePersister for SqlitePersister {
    fn load(&self) -> StoreFuture<'_, StoreResult<Vec<Message>>> {
        Box::pin(async move {
            let table = self.table.clone();
            let name = self.name.clone();
            let blob: Option<String> = self
                .conn
                .call(move |conn| {
                    let blob = conn
                        .query_row(
                            &format!("SELECT blob FROM {table} WHERE name = ?1"),
                            rusqlite::params![name],
                            |row| row.get(0),
                        )
                        .optional()?;
                    Ok(blob)
                })
                .await?;
            Ok(blob.as_deref().map(decode_blob).unwrap_or_default())
        })
    }

    fn save(&self, messages: Vec<Message>) -> StoreFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let table = self.table.clone();
            let name = self.name.clone();
            let blob = encode_blob(&messages)?;
            let now_ms = Utc::now().timestamp_millis();

            self.conn
                .call(move |conn| {
                    conn.execute(
                        &format!(
                            "INSERT INTO {table} (name, version, blob, updated_at)
                             VALUES (?1, ?2, ?3, ?4)
                             ON CONFLICT(name) DO UPDATE SET
                                version = excluded.version,
                                blob = excluded.blob,
                                updated_at = excluded.updated_at"
                        ),
                        rusqlite::params![name, SCHEMA_VERSION, blob, now_ms],
                    )?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }
}
