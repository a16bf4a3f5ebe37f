//! In-memory conversation store, used by tests and ephemeral setups.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use chat_core::conversation::Conversation;
use chat_core::message::Message;

use super::store::{
    apply_conversation_update, apply_message_update, ConversationStore, ConversationUpdate,
    MessageUpdate, Result, StoreError,
};

#[derive(Default)]
pub struct MemoryStore {
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>> {
        Ok(self.conversations.read().await.get(id).cloned())
    }

    async fn create_conversation(&self, id: &str) -> Result<Conversation> {
        let mut guard = self.conversations.write().await;
        let conversation = guard
            .entry(id.to_string())
            .or_insert_with(|| Conversation::new(id));
        Ok(conversation.clone())
    }

    async fn update_conversation(
        &self,
        id: &str,
        fields: ConversationUpdate,
    ) -> Result<Option<Conversation>> {
        let mut guard = self.conversations.write().await;
        let Some(conversation) = guard.get_mut(id) else {
            return Ok(None);
        };
        apply_conversation_update(conversation, fields);
        Ok(Some(conversation.clone()))
    }

    async fn get_message(&self, id: &str) -> Result<Option<Message>> {
        let guard = self.conversations.read().await;
        Ok(guard
            .values()
            .find_map(|c| c.message(id))
            .cloned())
    }

    async fn create_message(&self, message: Message) -> Result<Message> {
        let mut guard = self.conversations.write().await;
        let conversation = guard
            .get_mut(&message.conversation_id)
            .ok_or_else(|| StoreError::ConversationNotFound(message.conversation_id.clone()))?;
        conversation.push_message(message.clone());
        Ok(message)
    }

    async fn update_message(&self, id: &str, fields: MessageUpdate) -> Result<Option<Message>> {
        let mut guard = self.conversations.write().await;
        for conversation in guard.values_mut() {
            if let Some(message) = conversation.message_mut(id) {
                apply_message_update(message, fields);
                let updated = message.clone();
                conversation.touch();
                return Ok(Some(updated));
            }
        }
        Ok(None)
    }

    async fn insert_turn(
        &self,
        conversation_id: &str,
        user: Message,
        assistant: Message,
    ) -> Result<()> {
        let mut guard = self.conversations.write().await;
        let conversation = guard
            .get_mut(conversation_id)
            .ok_or_else(|| StoreError::ConversationNotFound(conversation_id.to_string()))?;
        conversation.push_message(user);
        conversation.push_message(assistant);
        Ok(())
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        let guard = self.conversations.read().await;
        let mut conversations: Vec<Conversation> = guard.values().cloned().collect();
        conversations.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(conversations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::message::{ContentBlock, MessageMetadata, Role};

    #[tokio::test]
    async fn create_message_requires_conversation() {
        let store = MemoryStore::new();
        let message = Message::new(
            "m1",
            Role::User,
            vec![ContentBlock::text("hi")],
            "missing",
            MessageMetadata::default(),
        );
        let err = store.create_message(message).await.unwrap_err();
        assert!(matches!(err, StoreError::ConversationNotFound(_)));
    }

    #[tokio::test]
    async fn insert_turn_appends_in_order() {
        let store = MemoryStore::new();
        store.create_conversation("c1").await.unwrap();

        let user = Message::new(
            "m1",
            Role::User,
            vec![ContentBlock::text("question")],
            "c1",
            MessageMetadata::default(),
        );
        let assistant = Message::new(
            "m2",
            Role::Assistant,
            vec![ContentBlock::text("answer")],
            "c1",
            MessageMetadata::default(),
        );
        store.insert_turn("c1", user, assistant).await.unwrap();

        let conversation = store.get_conversation("c1").await.unwrap().unwrap();
        let ids: Vec<&str> = conversation.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m1", "m2"]);
    }
}
