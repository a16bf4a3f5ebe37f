//! chat_llm - Streaming chat model providers
//!
//! A uniform [`ChatModel`] capability implemented once per vendor, with
//! [`ChatModelFactory`] as the single mapping point from logical model
//! names to concrete clients.

pub mod factory;
pub mod provider;
pub mod providers;

pub use factory::{ChatModelFactory, ModelResolver, AVAILABLE_MODELS};
pub use provider::{ChatError, ChatModel, ChatStream, Result, StreamDelta};
pub use providers::{AnthropicChatModel, GeminiChatModel, OpenAIChatModel};
