//! In-memory conversation store

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;
use wayfarer_llm::{Message, MessageRole};

/// One engine conversation
#[derive(Debug, Clone)]
pub struct Conversation {
    /// Engine-assigned id
    pub id: String,
    /// Owner
    pub principal_id: String,
    /// User and assistant turns, oldest first
    pub history: Vec<Message>,
    /// Named values shared between agents (`generated_response`, ...)
    pub state: HashMap<String, String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Conversations keyed by id
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl ConversationStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a conversation for `principal_id` and return its id
    pub async fn create(&self, principal_id: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let conversation = Conversation {
            id: id.clone(),
            principal_id: principal_id.to_string(),
            history: Vec::new(),
            state: HashMap::new(),
            created_at: Utc::now(),
        };
        self.conversations
            .write()
            .await
            .insert(id.clone(), conversation);
        id
    }

    /// Copy of a conversation
    pub async fn snapshot(&self, id: &str) -> Result<Conversation> {
        self.conversations
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::ConversationNotFound(id.to_string()))
    }

    /// Copy of a conversation, only if `principal_id` owns it.
    ///
    /// A conversation owned by someone else is reported as not found.
    pub async fn snapshot_owned(&self, principal_id: &str, id: &str) -> Result<Conversation> {
        let conversation = self.snapshot(id).await?;
        if conversation.principal_id != principal_id {
            return Err(Error::ConversationNotFound(id.to_string()));
        }
        Ok(conversation)
    }

    /// Append turns to the history
    pub async fn append(&self, id: &str, messages: impl IntoIterator<Item = Message>) -> Result<()> {
        self.update(id, |c| c.history.extend(messages)).await
    }

    /// Overwrite the latest assistant turn, or append one if there is none
    pub async fn replace_last_assistant(&self, id: &str, content: &str) -> Result<()> {
        self.update(id, |c| {
            match c
                .history
                .iter_mut()
                .rev()
                .find(|m| m.role == MessageRole::Assistant)
            {
                Some(last) => last.content = content.to_string(),
                None => c.history.push(Message::assistant(content)),
            }
        })
        .await
    }

    /// Set a state value
    pub async fn set_state(&self, id: &str, key: &str, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        self.update(id, |c| {
            c.state.insert(key.to_string(), value);
        })
        .await
    }

    /// Number of conversations
    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.conversations.read().await.is_empty()
    }

    async fn update(&self, id: &str, f: impl FnOnce(&mut Conversation)) -> Result<()> {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .get_mut(id)
            .ok_or_else(|| Error::ConversationNotFound(id.to_string()))?;
        f(conversation);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_owner_check() {
        let store = ConversationStore::new();
        let id = store.create("alice").await;

        assert!(store.snapshot_owned("alice", &id).await.is_ok());
        assert!(matches!(
            store.snapshot_owned("bob", &id).await,
            Err(Error::ConversationNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_history_and_state() {
        let store = ConversationStore::new();
        let id = store.create("u1").await;

        store
            .append(&id, [Message::user("Plan Goa"), Message::assistant("v1")])
            .await
            .unwrap();
        store.replace_last_assistant(&id, "v2").await.unwrap();
        store.set_state(&id, "generated_response", "v2").await.unwrap();

        let conversation = store.snapshot(&id).await.unwrap();
        assert_eq!(conversation.history.len(), 2);
        assert_eq!(conversation.history[1].content, "v2");
        assert_eq!(conversation.state["generated_response"], "v2");
    }

    #[tokio::test]
    async fn test_unknown_conversation() {
        let store = ConversationStore::new();
        assert!(store.append("missing", [Message::user("hi")]).await.is_err());
        assert!(store.is_empty().await);
    }
}
