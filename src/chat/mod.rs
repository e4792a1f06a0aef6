//! Conversation state for the chat core.
//!
//! - `ids`: message identifiers
//! - `message`: message model and patches
//! - `state`: the ordered log, busy flag, and shared store handle
//! - `persist`: versioned blob persistence (`SQLite` and in-memory)
//! - `export`: JSON history export

pub mod errors;
pub mod export;
pub mod ids;
pub mod message;
pub mod persist;
pub mod state;

pub use errors::{StoreError, StoreResult};
pub use export::ChatExport;
pub use ids::MessageId;
pub use message::{Message, MessagePatch, Sender};
pub use persist::{
    MemoryPersister, SCHEMA_VERSION, SqlitePersister, StatePersister, StoreFuture, decode_blob,
    encode_blob,
};
pub use state::{ChatState, ChatStore};
