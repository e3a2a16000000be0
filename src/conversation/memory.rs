//! In-memory conversation store.
//!
//! Lives for the lifetime of the process. Conversations are never evicted.

use super::{Checkpoint, ConversationStore, Message, TurnGuard};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Default)]
struct Conversation {
    messages: Vec<Message>,
    checkpoint: Option<Checkpoint>,
}

/// In-memory conversation store.
#[derive(Default)]
pub struct MemoryConversationStore {
    conversations: RwLock<HashMap<String, Conversation>>,
    turn_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of conversations seen so far.
    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn get(&self, id: &str) -> Result<Vec<Message>> {
        if let Some(conversation) = self.conversations.read().await.get(id) {
            return Ok(conversation.messages.clone());
        }

        let mut conversations = self.conversations.write().await;
        let conversation = conversations.entry(id.to_string()).or_default();
        Ok(conversation.messages.clone())
    }

    async fn append(&self, id: &str, message: Message) -> Result<()> {
        let mut conversations = self.conversations.write().await;
        conversations
            .entry(id.to_string())
            .or_default()
            .messages
            .push(message);
        Ok(())
    }

    async fn checkpoint(&self, id: &str) -> Result<Option<Checkpoint>> {
        let conversations = self.conversations.read().await;
        Ok(conversations.get(id).and_then(|c| c.checkpoint.clone()))
    }

    async fn set_checkpoint(&self, id: &str, checkpoint: Checkpoint) -> Result<()> {
        let mut conversations = self.conversations.write().await;
        conversations.entry(id.to_string()).or_default().checkpoint = Some(checkpoint);
        Ok(())
    }

    async fn lock(&self, id: &str) -> TurnGuard {
        let lock = {
            let mut locks = self.turn_locks.lock().await;
            locks
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{LoopState, Role};
    use std::time::Duration;

    #[tokio::test]
    async fn test_unknown_id_is_created_empty() {
        let store = MemoryConversationStore::new();
        assert!(store.get("thread-1").await.unwrap().is_empty());
        assert_eq!(store.len().await, 1);
        assert!(store.checkpoint("thread-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_append_preserves_order_per_conversation() {
        let store = MemoryConversationStore::new();
        store.append("a", Message::user("one")).await.unwrap();
        store.append("b", Message::user("other")).await.unwrap();
        store.append("a", Message::assistant("two")).await.unwrap();

        let history = store.get("a").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "one");
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(store.get("b").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_checkpoint_roundtrip() {
        let store = MemoryConversationStore::new();
        store
            .set_checkpoint("a", Checkpoint::new(LoopState::ToolDispatched, 2))
            .await
            .unwrap();

        let checkpoint = store.checkpoint("a").await.unwrap().unwrap();
        assert_eq!(checkpoint.state, LoopState::ToolDispatched);
        assert_eq!(checkpoint.iteration, 2);
        assert!(!checkpoint.is_complete());
    }

    #[tokio::test]
    async fn test_lock_serializes_same_conversation() {
        let store = Arc::new(MemoryConversationStore::new());
        let guard = store.lock("a").await;

        let waiter = {
            let store = store.clone();
            tokio::spawn(async move {
                let _guard = store.lock("a").await;
                store.append("a", Message::user("second")).await.unwrap();
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        store.append("a", Message::user("first")).await.unwrap();
        drop(guard);
        waiter.await.unwrap();

        let history = store.get("a").await.unwrap();
        assert_eq!(history[0].content, "first");
        assert_eq!(history[1].content, "second");
    }

    #[tokio::test]
    async fn test_lock_is_per_conversation() {
        let store = MemoryConversationStore::new();
        let _a = store.lock("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), store.lock("b")).await;
        assert!(b.is_ok());
    }
}
