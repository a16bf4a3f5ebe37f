//! Context assembly under a token budget.
//!
//! Produces the ordered `(role, content)` turns for a model call from
//! a conversation's history, the new (or regenerated) user turn, and
//! an optional token budget.
//!
//! Truncation policy: the history walk **breaks** at the first message
//! that would overflow the budget, rather than skipping it and trying
//! later ones. This keeps the included history a contiguous prefix of
//! the in-scope window with a predictable truncation point.

use std::sync::Arc;

use crate::budget::TokenCounter;
use crate::conversation::Conversation;
use crate::message::{filter_vision, ContentBlock, Role};

/// One turn of assembled context.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextTurn {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl ContextTurn {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: vec![ContentBlock::text(text)],
        }
    }
}

/// Inputs for one context build.
pub struct ContextRequest<'a> {
    pub conversation: &'a Conversation,
    /// Content of the inbound user message.
    pub new_content: &'a [ContentBlock],
    /// Id of the assistant message being regenerated, if any.
    pub regenerate_from: Option<&'a str>,
    /// Token budget; `None` means full history.
    pub max_tokens: Option<u32>,
    pub system_instructions: Option<&'a str>,
    pub vision_capable: bool,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ContextError {
    #[error("regeneration target '{0}' not found in conversation")]
    UnknownRegenerationTarget(String),
}

/// Assembles bounded model context from conversation history.
pub struct ContextBuilder {
    counter: Arc<dyn TokenCounter>,
}

impl ContextBuilder {
    pub fn new(counter: Arc<dyn TokenCounter>) -> Self {
        Self { counter }
    }

    /// Build the ordered context for one turn.
    ///
    /// The anchor turn (the new user content, or when regenerating the
    /// user turn immediately preceding the target) is reserved against
    /// the budget first and is always included, even when its own cost
    /// exceeds `max_tokens` - the budget is advisory in that one edge
    /// case.
    pub fn build(&self, request: &ContextRequest<'_>) -> Result<Vec<ContextTurn>, ContextError> {
        let conversation = request.conversation;

        // Anchor user content and the end (exclusive) of the history
        // walk. Regeneration re-asks the same user turn, so its anchor
        // is the message immediately preceding the target and history
        // stops just before it.
        let (anchor_content, scope_end) = match request.regenerate_from {
            Some(target_id) => {
                let target_index = conversation.position_of(target_id).ok_or_else(|| {
                    ContextError::UnknownRegenerationTarget(target_id.to_string())
                })?;
                if target_index == 0 {
                    // Target has no preceding user turn; fall back to
                    // the inbound content.
                    (filter_vision(request.new_content, request.vision_capable), 0)
                } else {
                    let anchor = &conversation.messages[target_index - 1];
                    (
                        filter_vision(&anchor.content, request.vision_capable),
                        target_index - 1,
                    )
                }
            }
            None => (
                filter_vision(request.new_content, request.vision_capable),
                conversation.messages.len(),
            ),
        };

        let anchor_tokens = self.counter.count_blocks(&anchor_content);
        let mut used = anchor_tokens;
        let mut turns = Vec::new();

        // System instructions are dropped whole when over budget,
        // never truncated.
        if let Some(instructions) = request.system_instructions.filter(|s| !s.is_empty()) {
            let system_tokens = self.counter.count_text(instructions);
            let fits = request
                .max_tokens
                .map_or(true, |budget| used.saturating_add(system_tokens) <= budget);
            if fits {
                turns.push(ContextTurn::system(instructions));
                used = used.saturating_add(system_tokens);
            } else {
                log::debug!(
                    "dropping system instructions ({} tokens over budget)",
                    system_tokens
                );
            }
        }

        for message in &conversation.messages[..scope_end] {
            let content = filter_vision(&message.content, request.vision_capable);
            let message_tokens = self.counter.count_blocks(&content);
            if let Some(budget) = request.max_tokens {
                if used.saturating_add(message_tokens) > budget {
                    log::debug!(
                        "context budget reached at message {}; truncating older history",
                        message.id
                    );
                    break;
                }
            }
            turns.push(ContextTurn {
                role: message.role,
                content,
            });
            used = used.saturating_add(message_tokens);
        }

        turns.push(ContextTurn {
            role: Role::User,
            content: anchor_content,
        });

        log::debug!(
            "built context: {} turns, ~{} tokens (budget {:?})",
            turns.len(),
            used,
            request.max_tokens
        );

        Ok(turns)
    }
}
