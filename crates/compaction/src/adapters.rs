//! Summarizer adapters for callers that do not implement the async trait.
//!
//! - [`FnSummarizer`] wraps a cheap synchronous closure and runs it inline.
//! - [`BlockingSummarizer`] wraps a closure that blocks (a synchronous HTTP
//!   client, a local model) and runs it on the blocking thread pool.
//! - [`OfflineSummarizer`] always reports itself unavailable, so every
//!   compaction uses the heuristic summary.

use async_trait::async_trait;
use ctxpack_core::error::SummarizerError;
use ctxpack_core::summarizer::Summarizer;
use std::sync::Arc;

/// A summarizer backed by a synchronous closure, called on the async task.
pub struct FnSummarizer<F> {
    name: String,
    f: F,
}

impl<F> FnSummarizer<F>
where
    F: Fn(&str) -> Result<String, SummarizerError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

#[async_trait]
impl<F> Summarizer for FnSummarizer<F>
where
    F: Fn(&str) -> Result<String, SummarizerError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn summarize(&self, prompt: &str) -> Result<String, SummarizerError> {
        (self.f)(prompt)
    }
}

/// A summarizer backed by a blocking closure, run via `spawn_blocking`.
///
/// A timeout abandons the blocking call but cannot interrupt it; the closure
/// runs to completion on its pool thread and its result is discarded.
pub struct BlockingSummarizer<F> {
    name: String,
    f: Arc<F>,
}

impl<F> BlockingSummarizer<F>
where
    F: Fn(&str) -> Result<String, SummarizerError> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f: Arc::new(f),
        }
    }
}

#[async_trait]
impl<F> Summarizer for BlockingSummarizer<F>
where
    F: Fn(&str) -> Result<String, SummarizerError> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn summarize(&self, prompt: &str) -> Result<String, SummarizerError> {
        let f = Arc::clone(&self.f);
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || f(&prompt))
            .await
            .map_err(|e| SummarizerError::Failed(format!("blocking summarizer panicked: {e}")))?
    }
}

/// A summarizer with no backing model.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSummarizer;

#[async_trait]
impl Summarizer for OfflineSummarizer {
    fn name(&self) -> &str {
        "offline"
    }

    async fn summarize(&self, _prompt: &str) -> Result<String, SummarizerError> {
        Err(SummarizerError::Unavailable(
            "no summarization model configured".into(),
        ))
    }
}
