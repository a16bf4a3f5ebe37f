//! Conversation records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::message::Message;

/// A conversation: an ordered sequence of owned messages plus an
/// optional generated title. Insertion order is conversation order.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Conversation {
    /// Opaque caller-supplied identifier
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub created_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,

    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            created_at: Utc::now(),
            updated_at: None,
            metadata: HashMap::new(),
            messages: Vec::new(),
        }
    }

    pub fn message(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }

    pub fn message_mut(&mut self, message_id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == message_id)
    }

    /// Position of a message in conversation order.
    pub fn position_of(&self, message_id: &str) -> Option<usize> {
        self.messages.iter().position(|m| m.id == message_id)
    }

    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ContentBlock, MessageMetadata, Role};

    #[test]
    fn test_push_preserves_order() {
        let mut conversation = Conversation::new("c1");
        for i in 0..3 {
            conversation.push_message(Message::new(
                format!("m{i}"),
                Role::User,
                vec![ContentBlock::text(format!("msg {i}"))],
                "c1",
                MessageMetadata::default(),
            ));
        }

        assert_eq!(conversation.position_of("m1"), Some(1));
        assert_eq!(conversation.messages[2].id, "m2");
        assert!(conversation.updated_at.is_some());
    }

    #[test]
    fn test_message_lookup() {
        let mut conversation = Conversation::new("c1");
        assert!(conversation.message("missing").is_none());

        conversation.push_message(Message::new(
            "m1",
            Role::User,
            vec![ContentBlock::text("hi")],
            "c1",
            MessageMetadata::default(),
        ));
        assert!(conversation.message("m1").is_some());
    }
}
