//! Conversation title generation.
//!
//! Invoked after a turn persists when the conversation is still
//! untitled. Failures here never fail the turn: every provider/parse
//! error collapses to "no title" with a warning log.

use std::sync::Arc;

use serde::Deserialize;

use chat_core::context::ContextTurn;
use chat_core::conversation::Conversation;
use chat_core::message::{joined_text, LlmSettings, Role};
use chat_llm::ModelResolver;

use crate::error::AppError;

const TITLE_PROMPT: &str = "You summarize conversations. Reply with a JSON object \
shaped exactly as {\"title\": \"...\"} and nothing else. The title is at most six \
words, in the language of the conversation, with no quotes or trailing punctuation. \
If the conversation has no real content (greetings only, test messages), use an \
empty string for the title.";

#[derive(Deserialize)]
struct TitleResponse {
    title: String,
}

pub struct TitleGenerator {
    resolver: Arc<dyn ModelResolver>,
    /// Logical model name used for title calls.
    model: String,
}

impl TitleGenerator {
    pub fn new(resolver: Arc<dyn ModelResolver>, model: impl Into<String>) -> Self {
        Self {
            resolver,
            model: model.into(),
        }
    }

    /// Generate a title for an untitled conversation, or `None` when
    /// the exchange is content-free or the model call fails.
    pub async fn generate(&self, conversation: &Conversation) -> Option<String> {
        let transcript = transcript(conversation);
        if transcript.is_empty() {
            return None;
        }

        match self.call_model(&transcript).await {
            Ok(title) if !title.trim().is_empty() => Some(title.trim().to_string()),
            Ok(_) => {
                log::debug!(
                    "title model judged conversation {} content-free",
                    conversation.id
                );
                None
            }
            Err(e) => {
                log::warn!(
                    "title generation failed for conversation {}: {}",
                    conversation.id,
                    e
                );
                None
            }
        }
    }

    async fn call_model(&self, transcript: &str) -> Result<String, AppError> {
        let settings = LlmSettings::new(&self.model);
        let model = self
            .resolver
            .resolve(&settings)
            .map_err(|e| AppError::TitleGeneration(e.to_string()))?;

        let context = vec![
            ContextTurn::system(TITLE_PROMPT),
            ContextTurn {
                role: Role::User,
                content: vec![chat_core::message::ContentBlock::text(transcript)],
            },
        ];

        let raw = model
            .complete(&context)
            .await
            .map_err(|e| AppError::TitleGeneration(e.to_string()))?;
        let parsed: TitleResponse = serde_json::from_str(strip_code_fence(&raw))
            .map_err(|e| AppError::TitleGeneration(format!("unparseable title response: {e}")))?;
        Ok(parsed.title)
    }
}

/// Flatten the conversation's text blocks into "role: text" lines.
/// Image blocks and empty messages contribute nothing.
fn transcript(conversation: &Conversation) -> String {
    conversation
        .messages
        .iter()
        .filter_map(|message| {
            let text = joined_text(&message.content);
            if text.trim().is_empty() {
                None
            } else {
                Some(format!("{}: {}", message.role.as_str(), text))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Models sometimes wrap the JSON object in a markdown code fence.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::message::{ContentBlock, Message, MessageMetadata};

    #[test]
    fn transcript_skips_images_and_blanks() {
        let mut conversation = Conversation::new("c1");
        conversation.push_message(Message::user(
            "m1",
            vec![
                ContentBlock::text("what is this?"),
                ContentBlock::image_url("https://example.com/cat.png"),
            ],
            "c1",
            MessageMetadata::default(),
        ));
        conversation.push_message(Message::assistant(
            "m2",
            vec![ContentBlock::text("   ")],
            "c1",
            MessageMetadata::default(),
        ));
        conversation.push_message(Message::assistant(
            "m3",
            vec![ContentBlock::text("a cat")],
            "c1",
            MessageMetadata::default(),
        ));

        let t = transcript(&conversation);
        assert_eq!(t, "user: what is this?\nassistant: a cat");
    }

    #[tokio::test]
    async fn model_failures_surface_as_title_errors_and_suppress_the_title() {
        use chat_core::budget::TokenizerFamily;
        use chat_llm::{ChatError, ChatModel};

        struct NoModels;
        impl ModelResolver for NoModels {
            fn resolve(
                &self,
                settings: &LlmSettings,
            ) -> chat_llm::Result<Arc<dyn ChatModel>> {
                Err(ChatError::UnknownModel(settings.model.clone()))
            }
            fn vision_capable(&self, _logical_name: &str) -> bool {
                false
            }
            fn tokenizer_family(&self, _logical_name: &str) -> TokenizerFamily {
                TokenizerFamily::Gpt
            }
        }

        let generator = TitleGenerator::new(Arc::new(NoModels), "Titler");

        let Err(err) = generator.call_model("user: hi").await else {
            panic!("expected the title call to fail");
        };
        assert!(matches!(err, AppError::TitleGeneration(_)));

        let mut conversation = Conversation::new("c1");
        conversation.push_message(Message::user(
            "m1",
            vec![ContentBlock::text("hello there")],
            "c1",
            MessageMetadata::default(),
        ));
        assert!(generator.generate(&conversation).await.is_none());
    }

    #[test]
    fn code_fences_are_stripped() {
        assert_eq!(
            strip_code_fence("```json\n{\"title\": \"Cats\"}\n```"),
            "{\"title\": \"Cats\"}"
        );
        assert_eq!(strip_code_fence("{\"title\": \"Cats\"}"), "{\"title\": \"Cats\"}");
    }
}
