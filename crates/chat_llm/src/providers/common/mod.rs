//! Helpers shared across providers.

pub mod sse;
