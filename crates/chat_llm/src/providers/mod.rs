//! Provider implementations of the [`ChatModel`](crate::ChatModel) capability.

pub mod anthropic;
pub mod common;
pub mod gemini;
pub mod openai;

pub use anthropic::AnthropicChatModel;
pub use gemini::GeminiChatModel;
pub use openai::OpenAIChatModel;

use chat_core::message::Role;

/// Wire role for OpenAI-compatible request bodies. `Error` never
/// appears in built context; it degrades to `user` if it ever does.
pub(crate) fn wire_role(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Error => "user",
    }
}
