//! Conversation state and its shared store handle.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::chat::errors::StoreResult;
use crate::chat::ids::MessageId;
use crate::chat::message::{Message, MessagePatch};
use crate::chat::persist::StatePersister;

/// Ordered message log plus the busy flag.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatState {
    /// Messages in conversation order.
    pub messages: Vec<Message>,
    /// True while an exchange is in flight.
    pub is_loading: bool,
}

impl ChatState {
    /// Create an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a message at the end. No id uniqueness check.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Overwrite the busy flag.
    pub const fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    /// Drop every message. The busy flag is left alone.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Patch a message by id. Returns `false` if the id is unknown.
    pub fn update(&mut self, id: MessageId, patch: MessagePatch) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.apply(patch);
                true
            }
            None => false,
        }
    }

    /// Remove a message by id. Returns `false` if the id is unknown.
    pub fn delete(&mut self, id: MessageId) -> bool {
        match self.messages.iter().position(|m| m.id == id) {
            Some(idx) => {
                self.messages.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Up to `n` most recent messages, oldest first.
    #[must_use]
    pub fn recent(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }
}

/// Shared, optionally persisted handle over a [`ChatState`].
///
/// Every mutation runs under the state lock and, when a persister is
/// attached, writes the whole message log before the lock is released.
/// Persistence failures are logged and never reach the caller.
#[derive(Clone, Default)]
pub struct ChatStore {
    state: Arc<Mutex<ChatState>>,
    persister: Option<Arc<dyn StatePersister>>,
}

impl ChatStore {
    /// Create an in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store rehydrated from `persister`.
    ///
    /// The busy flag always starts cleared.
    ///
    /// # Errors
    /// Returns an error if the persister cannot be read.
    pub async fn with_persister(persister: Arc<dyn StatePersister>) -> StoreResult<Self> {
        let messages = persister.load().await?;
        debug!("Rehydrated chat store with {} messages", messages.len());
        Ok(Self {
            state: Arc::new(Mutex::new(ChatState {
                messages,
                is_loading: false,
            })),
            persister: Some(persister),
        })
    }

    /// Append a message at the end of the log.
    pub async fn append(&self, message: Message) {
        self.mutate(|state| state.append(message)).await;
    }

    /// Overwrite the busy flag.
    pub async fn set_loading(&self, loading: bool) {
        self.mutate(|state| state.set_loading(loading)).await;
    }

    /// Empty the log. The busy flag is untouched.
    pub async fn clear(&self) {
        self.mutate(ChatState::clear).await;
    }

    /// Patch a message by id; unknown ids are ignored.
    pub async fn update(&self, id: MessageId, patch: MessagePatch) -> bool {
        self.mutate(|state| state.update(id, patch)).await
    }

    /// Remove a message by id; unknown ids are ignored.
    pub async fn delete(&self, id: MessageId) -> bool {
        self.mutate(|state| state.delete(id)).await
    }

    /// Copy of the full state.
    pub async fn snapshot(&self) -> ChatState {
        self.state.lock().await.clone()
    }

    /// Copy of the message log.
    pub async fn messages(&self) -> Vec<Message> {
        self.state.lock().await.messages.clone()
    }

    /// Current busy flag.
    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.is_loading
    }

    /// Number of messages.
    pub async fn len(&self) -> usize {
        self.state.lock().await.messages.len()
    }

    /// Whether the log is empty.
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.messages.is_empty()
    }

    /// Copy of up to `n` most recent messages, oldest first.
    pub async fn recent(&self, n: usize) -> Vec<Message> {
        self.state.lock().await.recent(n).to_vec()
    }

    async fn mutate<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut ChatState) -> R,
    {
        let mut state = self.state.lock().await;
        let out = f(&mut *state);
        if let Some(persister) = &self.persister {
            if let Err(err) = persister.save(state.messages.clone()).await {
                warn!("Failed to persist chat state: {err}");
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::errors::StoreError;
    use crate::chat::message::Sender;
    use crate::chat::persist::{MemoryPersister, StoreFuture};

    struct BrokenPersister;

    impl StatePersister for BrokenPersister {
        fn load(&self) -> StoreFuture<'_, StoreResult<Vec<Message>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn save(&self, _messages: Vec<Message>) -> StoreFuture<'_, StoreResult<()>> {
            Box::pin(async { Err(StoreError::Io(std::io::Error::other("disk full"))) })
        }
    }

    #[tokio::test]
    async fn test_append_goes_last() {
        let store = ChatStore::new();
        let mut seen = Vec::new();
        for (i, sender) in [Sender::User, Sender::Ai, Sender::User].into_iter().enumerate() {
            let msg = Message::new(sender, format!("message {i}"));
            store.append(msg.clone()).await;
            let messages = store.messages().await;
            let last = messages.last().unwrap();
            assert_eq!(last, &msg);
            assert_eq!(last.sender, sender);
            assert!(!seen.contains(&last.id));
            seen.push(last.id);
        }
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_clear_keeps_loading() {
        let store = ChatStore::new();
        for i in 0..5 {
            store.append(Message::user(format!("m{i}"))).await;
        }
        store.set_loading(true).await;
        store.clear().await;
        assert!(store.is_empty().await);
        assert!(store.is_loading().await);

        store.clear().await;
        assert!(store.messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete_by_id() {
        let store = ChatStore::new();
        let first = Message::user("first");
        let second = Message::ai("second");
        store.append(first.clone()).await;
        store.append(second.clone()).await;

        assert!(store.update(second.id, MessagePatch::text("edited")).await);
        assert!(!store.update(MessageId::new(), MessagePatch::text("x")).await);
        assert!(!store.delete(MessageId::new()).await);
        assert_eq!(store.len().await, 2);

        assert!(store.delete(first.id).await);
        let messages = store.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, second.id);
        assert_eq!(messages[0].text, "edited");
    }

    #[test]
    fn test_recent_window() {
        let mut state = ChatState::new();
        for i in 0..4 {
            state.append(Message::user(format!("m{i}")));
        }
        let recent: Vec<&str> = state.recent(2).iter().map(|m| m.text.as_str()).collect();
        assert_eq!(recent, vec!["m2", "m3"]);
        assert_eq!(state.recent(10).len(), 4);
        assert!(state.recent(0).is_empty());
    }

    #[tokio::test]
    async fn test_persists_and_rehydrates() {
        let persister = Arc::new(MemoryPersister::new());
        let store = ChatStore::with_persister(persister.clone()).await.unwrap();
        store.append(Message::user("hello")).await;
        store.set_loading(true).await;

        let restored = ChatStore::with_persister(persister.clone()).await.unwrap();
        assert_eq!(restored.messages().await, store.messages().await);
        assert!(!restored.is_loading().await);

        store.clear().await;
        let cleared = ChatStore::with_persister(persister).await.unwrap();
        assert!(cleared.is_empty().await);
    }

    #[tokio::test]
    async fn test_persist_failure_is_absorbed() {
        let store = ChatStore::with_persister(Arc::new(BrokenPersister)).await.unwrap();
        store.append(Message::user("still works")).await;
        assert_eq!(store.len().await, 1);
    }

    #[test]
    fn test_state_serializes_camel_case() {
        let json = serde_json::to_value(ChatState::new()).unwrap();
        assert_eq!(json["isLoading"], serde_json::json!(false));
        assert!(json["messages"].as_array().unwrap().is_empty());
    }
}
