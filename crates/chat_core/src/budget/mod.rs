//! Token budgeting for context assembly.

mod counter;

pub use counter::{HeuristicTokenCounter, TokenCounter, TokenizerFamily, IMAGE_BLOCK_TOKENS};
