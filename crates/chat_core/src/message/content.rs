//! ContentBlock - Message content types
//!
//! Defines the different kinds of content that can appear in messages.

use serde::{Deserialize, Serialize};

/// A block of message content (text or image reference).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Text content
    Text { text: String },

    /// Image referenced by URL
    ImageUrl { url: String },

    /// Unrecognized block type from a newer client. Preserved on the
    /// wire but contributes nothing to context or token accounting.
    #[serde(other)]
    Unknown,
}

impl ContentBlock {
    /// Create a text content block
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create an image content block from a URL
    pub fn image_url(url: impl Into<String>) -> Self {
        Self::ImageUrl { url: url.into() }
    }

    /// Get text content if this is a text block
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::ImageUrl { .. })
    }
}

/// Concatenate the text of every text block, space-separated.
pub fn joined_text(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(|b| b.as_text())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drop image blocks unless the target model can accept them.
pub fn filter_vision(blocks: &[ContentBlock], vision_capable: bool) -> Vec<ContentBlock> {
    if vision_capable {
        blocks.to_vec()
    } else {
        blocks.iter().filter(|b| !b.is_image()).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joined_text() {
        let blocks = vec![
            ContentBlock::text("Hello"),
            ContentBlock::image_url("https://example.com/a.png"),
            ContentBlock::text("world"),
        ];
        assert_eq!(joined_text(&blocks), "Hello world");
    }

    #[test]
    fn test_filter_vision_drops_images() {
        let blocks = vec![
            ContentBlock::text("look at this"),
            ContentBlock::image_url("https://example.com/a.png"),
        ];

        let filtered = filter_vision(&blocks, false);
        assert_eq!(filtered.len(), 1);
        assert!(!filtered[0].is_image());

        let kept = filter_vision(&blocks, true);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_unknown_block_type_deserializes() {
        let raw = r#"{"type": "audio", "data": "xxx"}"#;
        let block: ContentBlock = serde_json::from_str(raw).unwrap();
        assert_eq!(block, ContentBlock::Unknown);
    }

    #[test]
    fn test_tagged_serialization() {
        let block = ContentBlock::text("hi");
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["text"], "hi");
    }
}
