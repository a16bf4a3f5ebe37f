//! Wire DTOs for the session transport boundary.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use chat_core::message::{
    ContentBlock, LlmSettings, Message, MessageMetadata, MessageStatus, MessageVersion, Role,
};

/// Inbound metadata on a turn request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMetadata {
    pub llm: LlmSettings,

    /// Id of the assistant message to regenerate, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_to_regenerate: Option<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// One inbound conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageIn {
    /// Client-generated id for the user message.
    pub id: String,
    pub conversation_id: String,
    pub content: Vec<ContentBlock>,
    pub metadata: InboundMetadata,
}

impl MessageIn {
    /// Metadata stored on the persisted user message.
    pub fn user_metadata(&self) -> MessageMetadata {
        MessageMetadata {
            llm: Some(self.metadata.llm.clone()),
            versions: Vec::new(),
            extra: self.metadata.extra.clone(),
        }
    }
}

/// Outbound metadata attached to streamed events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutboundMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmSettings>,

    #[serde(default)]
    pub versions: Vec<MessageVersion>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl From<MessageMetadata> for OutboundMetadata {
    fn from(metadata: MessageMetadata) -> Self {
        Self {
            llm: metadata.llm,
            versions: metadata.versions,
            extra: metadata.extra,
        }
    }
}

/// One outbound event: a discriminated message snapshot
/// (`incomplete` / `complete` / `error`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageOut {
    pub id: String,
    pub role: Role,
    pub content: Vec<ContentBlock>,
    pub status: MessageStatus,
    pub conversation_id: String,
    pub metadata: OutboundMetadata,
}

impl MessageOut {
    /// Partial snapshot carrying one incremental delta.
    pub fn incomplete(
        id: &str,
        conversation_id: &str,
        delta: &str,
        metadata: OutboundMetadata,
    ) -> Self {
        Self {
            id: id.to_string(),
            role: Role::Assistant,
            content: vec![ContentBlock::text(delta)],
            status: MessageStatus::Incomplete,
            conversation_id: conversation_id.to_string(),
            metadata,
        }
    }

    pub fn complete(message: &Message) -> Self {
        Self {
            id: message.id.clone(),
            role: message.role,
            content: message.content.clone(),
            status: MessageStatus::Complete,
            conversation_id: message.conversation_id.clone(),
            metadata: message.metadata.clone().into(),
        }
    }

    /// Terminal error event for a failed turn.
    pub fn error(conversation_id: &str, detail: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::Error,
            content: vec![ContentBlock::text(detail)],
            status: MessageStatus::Error,
            conversation_id: conversation_id.to_string(),
            metadata: OutboundMetadata::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_turn_request_deserializes() {
        let raw = r#"{
            "id": "m1",
            "conversation_id": "c1",
            "content": [{"type": "text", "text": "hi"}],
            "metadata": {
                "llm": {"model": "GPT-4", "temperature": 70, "max_tokens": 512},
                "message_to_regenerate": "m0"
            }
        }"#;

        let message: MessageIn = serde_json::from_str(raw).unwrap();
        assert_eq!(message.metadata.llm.model, "GPT-4");
        assert_eq!(message.metadata.llm.temperature, Some(70.0));
        assert_eq!(message.metadata.message_to_regenerate.as_deref(), Some("m0"));
    }

    #[test]
    fn error_event_shape() {
        let event = MessageOut::error("c1", "provider down");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["role"], "error");
        assert_eq!(json["status"], "error");
        assert_eq!(json["conversation_id"], "c1");
        assert_eq!(json["content"][0]["text"], "provider down");
    }
}
