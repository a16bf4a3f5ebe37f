//! Token counting for context budgeting.
//!
//! Provides heuristic token estimation (chars/4 + safety margin). The
//! budget only needs a safe upper approximation, so exactness per
//! vendor tokenizer is not a goal.

use crate::message::ContentBlock;

/// Flat token cost charged per image block.
///
/// Exact image-token cost is provider-specific (tiling, resolution);
/// this constant is a deliberately conservative upper bound so the
/// budget never underestimates.
pub const IMAGE_BLOCK_TOKENS: u32 = 1024;

/// Tokenizer family of a model, used to pick estimation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenizerFamily {
    #[default]
    Gpt,
    Claude,
    Gemini,
}

/// Trait for token counting implementations.
///
/// Deterministic, no side effects, never fails. Unknown block types
/// count as zero and are reported at warn level.
pub trait TokenCounter: Send + Sync {
    /// Count tokens in a plain text string.
    fn count_text(&self, text: &str) -> u32;

    /// Count tokens in a sequence of content blocks.
    fn count_blocks(&self, blocks: &[ContentBlock]) -> u32 {
        blocks
            .iter()
            .map(|block| match block {
                ContentBlock::Text { text } => self.count_text(text),
                ContentBlock::ImageUrl { .. } => IMAGE_BLOCK_TOKENS,
                ContentBlock::Unknown => {
                    log::warn!("unknown content block type counted as 0 tokens");
                    0
                }
            })
            .fold(0u32, |acc, x| acc.saturating_add(x))
    }
}

/// Heuristic token counter using character-based estimation.
///
/// Uses the approximation tokens ≈ characters / 4 with a 10% safety
/// margin. Intentionally conservative to avoid underestimating.
#[derive(Debug, Clone)]
pub struct HeuristicTokenCounter {
    /// Characters per token ratio (default: 4)
    chars_per_token: f64,
    /// Safety margin multiplier (default: 1.1 = 10% extra)
    safety_margin: f64,
}

impl HeuristicTokenCounter {
    pub fn new(chars_per_token: f64, safety_margin: f64) -> Self {
        Self {
            chars_per_token,
            safety_margin,
        }
    }

    /// Estimation parameters for a model's tokenizer family.
    ///
    /// Claude tokenizers run slightly denser than GPT's; Gemini is
    /// close enough to the default that it shares it.
    pub fn for_family(family: TokenizerFamily) -> Self {
        match family {
            TokenizerFamily::Gpt | TokenizerFamily::Gemini => Self::new(4.0, 1.1),
            TokenizerFamily::Claude => Self::new(3.8, 1.1),
        }
    }
}

impl Default for HeuristicTokenCounter {
    fn default() -> Self {
        Self::new(4.0, 1.1)
    }
}

impl TokenCounter for HeuristicTokenCounter {
    fn count_text(&self, text: &str) -> u32 {
        if text.is_empty() {
            return 0;
        }

        let char_count = text.chars().count() as f64;
        let base_tokens = char_count / self.chars_per_token;
        let adjusted_tokens = base_tokens * self.safety_margin;

        adjusted_tokens.ceil() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_counter_counts_text() {
        let counter = HeuristicTokenCounter::default();

        // "Hello, world!" = 13 chars -> 13/4 * 1.1 ≈ 3.57 -> 4 tokens
        let tokens = counter.count_text("Hello, world!");
        assert!(tokens >= 3 && tokens <= 5, "expected ~4 tokens, got {}", tokens);
    }

    #[test]
    fn heuristic_counter_counts_empty_text() {
        let counter = HeuristicTokenCounter::default();
        assert_eq!(counter.count_text(""), 0);
    }

    #[test]
    fn image_blocks_cost_flat_constant() {
        let counter = HeuristicTokenCounter::default();
        let blocks = vec![
            ContentBlock::text("hi"),
            ContentBlock::image_url("https://example.com/a.png"),
        ];

        let tokens = counter.count_blocks(&blocks);
        assert_eq!(tokens, counter.count_text("hi") + IMAGE_BLOCK_TOKENS);
    }

    #[test]
    fn unknown_blocks_count_zero() {
        let counter = HeuristicTokenCounter::default();
        assert_eq!(counter.count_blocks(&[ContentBlock::Unknown]), 0);
    }

    #[test]
    fn family_parameters_differ() {
        let gpt = HeuristicTokenCounter::for_family(TokenizerFamily::Gpt);
        let claude = HeuristicTokenCounter::for_family(TokenizerFamily::Claude);

        let text = "The quick brown fox jumps over the lazy dog";
        assert!(claude.count_text(text) >= gpt.count_text(text));
    }

    #[test]
    fn safety_margin_applied() {
        let no_margin = HeuristicTokenCounter::new(4.0, 1.0);
        let with_margin = HeuristicTokenCounter::new(4.0, 1.1);

        let text = "Hello world!"; // 12 chars
        assert!(with_margin.count_text(text) > no_margin.count_text(text));
    }
}
