//! Summarizer trait: the abstraction over the LLM call that condenses history.
//!
//! The engine hands a fully-built prompt to a `Summarizer` and expects summary
//! text back. Whether the implementation blocks a thread or awaits a network
//! call is hidden behind this one async method; adapters for synchronous
//! closures live in `ctxpack-compaction`.
//!
//! Retries and backoff belong to the implementation, not the engine.

use async_trait::async_trait;
use crate::error::SummarizerError;

/// The external summarization capability.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Short name for logs (e.g., "anthropic", "heuristic").
    fn name(&self) -> &str;

    /// Produce a summary for the given prompt.
    async fn summarize(&self, prompt: &str) -> std::result::Result<String, SummarizerError>;
}
