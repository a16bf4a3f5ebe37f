//! Bounded context assembly for model calls.

mod builder;

pub use builder::{ContextBuilder, ContextError, ContextRequest, ContextTurn};
