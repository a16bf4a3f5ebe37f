//! chat_core - Core types and logic for the conversation backend
//!
//! This crate provides the foundational pieces used across all chat-related crates:
//! - `message` - Message, Role, ContentBlock and regeneration version history
//! - `conversation` - Conversation records with ordered message history
//! - `budget` - Token estimation for context budgeting
//! - `context` - Bounded context assembly for model calls
//! - `config` - Provider credential configuration

pub mod budget;
pub mod config;
pub mod context;
pub mod conversation;
pub mod message;

// Re-export commonly used types
pub use budget::{HeuristicTokenCounter, TokenCounter, TokenizerFamily, IMAGE_BLOCK_TOKENS};
pub use config::{Config, ProviderKeys};
pub use context::{ContextBuilder, ContextError, ContextRequest, ContextTurn};
pub use conversation::Conversation;
pub use message::{
    ContentBlock, LlmSettings, Message, MessageMetadata, MessageStatus, MessageVersion, Role,
    MAX_VERSION_HISTORY,
};
