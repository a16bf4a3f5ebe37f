use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

use chat_core::conversation::Conversation;
use chat_core::message::{ContentBlock, Message, MessageMetadata, MessageStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Invalid id '{0}'")]
    InvalidId(String),

    #[error("Conversation '{0}' not found")]
    ConversationNotFound(String),
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Partial update of a conversation record.
#[derive(Debug, Clone, Default)]
pub struct ConversationUpdate {
    pub title: Option<String>,
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl ConversationUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            metadata: None,
        }
    }
}

/// Partial update of a message record.
#[derive(Debug, Clone, Default)]
pub struct MessageUpdate {
    pub content: Option<Vec<ContentBlock>>,
    pub status: Option<MessageStatus>,
    pub metadata: Option<MessageMetadata>,
}

/// Persistence interface for conversations and their messages.
///
/// Message ids are globally unique; lookups by message id do not
/// require the owning conversation.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>>;

    /// Get-or-create: idempotent on id, so racing first messages to
    /// the same new conversation converge on one record.
    async fn create_conversation(&self, id: &str) -> Result<Conversation>;

    async fn update_conversation(
        &self,
        id: &str,
        fields: ConversationUpdate,
    ) -> Result<Option<Conversation>>;

    async fn get_message(&self, id: &str) -> Result<Option<Message>>;

    async fn create_message(&self, message: Message) -> Result<Message>;

    async fn update_message(&self, id: &str, fields: MessageUpdate) -> Result<Option<Message>>;

    /// Insert the user+assistant pair of one completed turn as a
    /// single unit: either both messages become visible or neither.
    async fn insert_turn(
        &self,
        conversation_id: &str,
        user: Message,
        assistant: Message,
    ) -> Result<()>;

    async fn list_conversations(&self) -> Result<Vec<Conversation>>;
}

pub(crate) fn apply_conversation_update(conversation: &mut Conversation, fields: ConversationUpdate) {
    if let Some(title) = fields.title {
        conversation.title = Some(title);
    }
    if let Some(metadata) = fields.metadata {
        conversation.metadata = metadata;
    }
    conversation.touch();
}

pub(crate) fn apply_message_update(message: &mut Message, fields: MessageUpdate) {
    if let Some(content) = fields.content {
        message.content = content;
    }
    if let Some(status) = fields.status {
        message.status = status;
    }
    if let Some(metadata) = fields.metadata {
        message.metadata = metadata;
    }
}
