//! Message records and regeneration version history.

mod content;

pub use content::{filter_vision, joined_text, ContentBlock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maximum number of superseded completions kept on a message.
///
/// Every regeneration prepends the previous completion to `versions`,
/// which would otherwise grow without bound; the oldest entries are
/// dropped past this limit.
pub const MAX_VERSION_HISTORY: usize = 20;

/// Who authored a message or context turn.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    /// Terminal error events delivered over the stream transport.
    Error,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Error => "error",
        }
    }
}

/// Lifecycle state of a message.
///
/// `Incomplete` only appears on streamed partial snapshots; persisted
/// messages settle to `Complete` or `Error`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    #[default]
    Complete,
    Incomplete,
    Error,
}

/// Per-call model settings carried in message metadata.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LlmSettings {
    /// Logical model name (e.g. "GPT-4", "Claude Sonnet")
    pub model: String,

    /// Sampling temperature on a 0-100 percent scale
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Context token budget for this call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// System instructions prepended to the context when they fit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl LlmSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            max_tokens: None,
            instructions: None,
        }
    }
}

/// A full snapshot of a superseded assistant completion.
///
/// `metadata.versions` is always empty on a snapshot; history does not
/// nest.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MessageVersion {
    pub role: Role,
    pub content: Vec<ContentBlock>,
    pub metadata: MessageMetadata,
}

/// Message metadata: originating model settings plus the bounded list
/// of prior completions, newest first.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct MessageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmSettings>,

    #[serde(default)]
    pub versions: Vec<MessageVersion>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl MessageMetadata {
    pub fn with_llm(llm: LlmSettings) -> Self {
        Self {
            llm: Some(llm),
            versions: Vec::new(),
            extra: HashMap::new(),
        }
    }

    /// Prepend a superseded completion, dropping the oldest entry past
    /// [`MAX_VERSION_HISTORY`].
    pub fn push_version(&mut self, version: MessageVersion) {
        self.versions.insert(0, version);
        self.versions.truncate(MAX_VERSION_HISTORY);
    }
}

/// A persisted message belonging to exactly one conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub status: MessageStatus,
    pub conversation_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: MessageMetadata,
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        role: Role,
        content: Vec<ContentBlock>,
        conversation_id: impl Into<String>,
        metadata: MessageMetadata,
    ) -> Self {
        Self {
            id: id.into(),
            role,
            content,
            status: MessageStatus::Complete,
            conversation_id: conversation_id.into(),
            created_at: Utc::now(),
            metadata,
        }
    }

    pub fn user(
        id: impl Into<String>,
        content: Vec<ContentBlock>,
        conversation_id: impl Into<String>,
        metadata: MessageMetadata,
    ) -> Self {
        Self::new(id, Role::User, content, conversation_id, metadata)
    }

    pub fn assistant(
        id: impl Into<String>,
        content: Vec<ContentBlock>,
        conversation_id: impl Into<String>,
        metadata: MessageMetadata,
    ) -> Self {
        Self::new(id, Role::Assistant, content, conversation_id, metadata)
    }

    /// Snapshot this message's content and settings for the versions
    /// list. The snapshot's own `versions` is emptied so history does
    /// not nest.
    pub fn version_snapshot(&self) -> MessageVersion {
        MessageVersion {
            role: self.role,
            content: self.content.clone(),
            metadata: MessageMetadata {
                llm: self.metadata.llm.clone(),
                versions: Vec::new(),
                extra: self.metadata.extra.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_message(id: &str, text: &str) -> Message {
        Message::assistant(
            id,
            vec![ContentBlock::text(text)],
            "c1",
            MessageMetadata::with_llm(LlmSettings::new("GPT-4")),
        )
    }

    #[test]
    fn test_version_snapshot_strips_history() {
        let mut message = text_message("m1", "first");
        message.metadata.push_version(MessageVersion {
            role: Role::Assistant,
            content: vec![ContentBlock::text("zeroth")],
            metadata: MessageMetadata::default(),
        });

        let snapshot = message.version_snapshot();
        assert!(snapshot.metadata.versions.is_empty());
        assert_eq!(snapshot.content, message.content);
        assert_eq!(snapshot.metadata.llm, message.metadata.llm);
    }

    #[test]
    fn test_push_version_newest_first() {
        let mut metadata = MessageMetadata::default();
        for i in 0..3 {
            metadata.push_version(MessageVersion {
                role: Role::Assistant,
                content: vec![ContentBlock::text(format!("v{i}"))],
                metadata: MessageMetadata::default(),
            });
        }
        assert_eq!(metadata.versions[0].content[0].as_text(), Some("v2"));
        assert_eq!(metadata.versions[2].content[0].as_text(), Some("v0"));
    }

    #[test]
    fn test_push_version_bounded() {
        let mut metadata = MessageMetadata::default();
        for i in 0..(MAX_VERSION_HISTORY + 5) {
            metadata.push_version(MessageVersion {
                role: Role::Assistant,
                content: vec![ContentBlock::text(format!("v{i}"))],
                metadata: MessageMetadata::default(),
            });
        }
        assert_eq!(metadata.versions.len(), MAX_VERSION_HISTORY);
        // Newest survives, oldest dropped
        let newest = format!("v{}", MAX_VERSION_HISTORY + 4);
        assert_eq!(metadata.versions[0].content[0].as_text(), Some(newest.as_str()));
    }

    #[test]
    fn test_status_roundtrip() {
        let json = serde_json::to_value(MessageStatus::Incomplete).unwrap();
        assert_eq!(json, "incomplete");
        let status: MessageStatus = serde_json::from_value(json).unwrap();
        assert_eq!(status, MessageStatus::Incomplete);
    }
}
