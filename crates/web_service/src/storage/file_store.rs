//! File-backed conversation store.
//!
//! One JSON document per conversation. Every mutation rewrites the
//! whole document, which is what makes a turn's writes visible
//! all-or-nothing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use chat_core::conversation::Conversation;
use chat_core::message::Message;

use super::store::{
    apply_conversation_update, apply_message_update, ConversationStore, ConversationUpdate,
    MessageUpdate, Result, StoreError,
};

pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        // Conversation ids become file names; reject anything that
        // could escape the base directory.
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.base_dir.join(format!("{}.json", id)))
    }

    async fn load(&self, id: &str) -> Result<Option<Conversation>> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await?;
        let conversation: Conversation = serde_json::from_str(&content)?;

        tracing::debug!(
            conversation_id = %id,
            message_count = conversation.messages.len(),
            "FileStore: conversation loaded"
        );

        Ok(Some(conversation))
    }

    async fn save(&self, conversation: &Conversation) -> Result<()> {
        let path = self.path_for(&conversation.id)?;

        if !self.base_dir.exists() {
            fs::create_dir_all(&self.base_dir).await?;
        }

        let content = serde_json::to_string_pretty(conversation)?;
        fs::write(&path, content).await?;

        tracing::debug!(
            conversation_id = %conversation.id,
            path = %path.display(),
            message_count = conversation.messages.len(),
            "FileStore: conversation saved"
        );

        Ok(())
    }

    /// Scan all conversation documents for a message id.
    async fn find_owning_conversation(&self, message_id: &str) -> Result<Option<Conversation>> {
        for conversation in self.list_conversations().await? {
            if conversation.message(message_id).is_some() {
                return Ok(Some(conversation));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl ConversationStore for FileStore {
    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>> {
        self.load(id).await
    }

    async fn create_conversation(&self, id: &str) -> Result<Conversation> {
        if let Some(existing) = self.load(id).await? {
            return Ok(existing);
        }
        let conversation = Conversation::new(id);
        self.save(&conversation).await?;
        tracing::info!(conversation_id = %id, "FileStore: conversation created");
        Ok(conversation)
    }

    async fn update_conversation(
        &self,
        id: &str,
        fields: ConversationUpdate,
    ) -> Result<Option<Conversation>> {
        let Some(mut conversation) = self.load(id).await? else {
            return Ok(None);
        };
        apply_conversation_update(&mut conversation, fields);
        self.save(&conversation).await?;
        Ok(Some(conversation))
    }

    async fn get_message(&self, id: &str) -> Result<Option<Message>> {
        Ok(self
            .find_owning_conversation(id)
            .await?
            .and_then(|c| c.message(id).cloned()))
    }

    async fn create_message(&self, message: Message) -> Result<Message> {
        let mut conversation = self
            .load(&message.conversation_id)
            .await?
            .ok_or_else(|| StoreError::ConversationNotFound(message.conversation_id.clone()))?;
        conversation.push_message(message.clone());
        self.save(&conversation).await?;
        Ok(message)
    }

    async fn update_message(&self, id: &str, fields: MessageUpdate) -> Result<Option<Message>> {
        let Some(mut conversation) = self.find_owning_conversation(id).await? else {
            return Ok(None);
        };
        let Some(message) = conversation.message_mut(id) else {
            return Ok(None);
        };
        apply_message_update(message, fields);
        let updated = message.clone();
        conversation.touch();
        self.save(&conversation).await?;
        Ok(Some(updated))
    }

    async fn insert_turn(
        &self,
        conversation_id: &str,
        user: Message,
        assistant: Message,
    ) -> Result<()> {
        let mut conversation = self
            .load(conversation_id)
            .await?
            .ok_or_else(|| StoreError::ConversationNotFound(conversation_id.to_string()))?;
        conversation.push_message(user);
        conversation.push_message(assistant);
        // Single write: both messages land or neither does.
        self.save(&conversation).await
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        let mut conversations = Vec::new();
        if !self.base_dir.exists() {
            return Ok(conversations);
        }

        let mut entries = fs::read_dir(&self.base_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = fs::read_to_string(&path).await?;
            match serde_json::from_str::<Conversation>(&content) {
                Ok(conversation) => conversations.push(conversation),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "FileStore: skipping unreadable conversation file"
                    );
                }
            }
        }

        conversations.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(conversations)
    }
}
