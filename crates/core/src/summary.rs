//! Branch summaries and the store that keeps them.
//!
//! A [`BranchSummary`] is derived from a summarized prefix; it is not part of
//! the entry sequence. The engine caches summaries by fingerprint and hands
//! the newest one per branch to a [`SummaryStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::entry::FileOperation;
use crate::error::StoreError;

/// Where the summary text came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarySource {
    /// Produced by the external summarizer
    Model,
    /// Deterministic fallback built from entry counts
    Heuristic,
    /// Nothing was summarized
    #[default]
    None,
}

/// The summary of one branch prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchSummary {
    /// Branch the summarized entries belong to
    pub branch_id: String,

    /// Summary text (empty when nothing was summarized)
    pub summary: String,

    /// Number of entries the summary covers
    pub entry_count: usize,

    /// File operations remaining after deduplication
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_operations: Vec<FileOperation>,

    /// Whether any summarized entry carried an error flag
    #[serde(default)]
    pub has_errors: bool,

    /// Model or heuristic
    #[serde(default)]
    pub source: SummarySource,

    /// Cache key this summary was stored under
    #[serde(default)]
    pub fingerprint: String,

    /// When the summary was first produced
    pub created_at: DateTime<Utc>,
}

impl BranchSummary {
    /// A summary that covers nothing, returned when compaction is a no-op.
    pub fn empty(branch_id: impl Into<String>) -> Self {
        Self {
            branch_id: branch_id.into(),
            summary: String::new(),
            entry_count: 0,
            file_operations: Vec::new(),
            has_errors: false,
            source: SummarySource::None,
            fingerprint: String::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }
}

/// Persistence for the current summary of each branch.
///
/// Implementations: in-memory (in `ctxpack-compaction`), or a session
/// database owned by the embedding runtime.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// The store name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Record a summary as the current one for its branch.
    async fn put(&self, summary: BranchSummary) -> std::result::Result<(), StoreError>;

    /// The current summary for a branch.
    async fn latest(&self, branch_id: &str) -> std::result::Result<Option<BranchSummary>, StoreError>;

    /// Every summary recorded for a branch, oldest first.
    async fn history(&self, branch_id: &str) -> std::result::Result<Vec<BranchSummary>, StoreError>;

    /// Forget all summaries for a branch. Returns whether anything was removed.
    async fn clear(&self, branch_id: &str) -> std::result::Result<bool, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_summary_covers_nothing() {
        let summary = BranchSummary::empty("main");
        assert!(summary.is_empty());
        assert_eq!(summary.source, SummarySource::None);
        assert!(summary.summary.is_empty());
    }

    #[test]
    fn summary_serialization() {
        let mut summary = BranchSummary::empty("feature");
        summary.summary = "Refactored the parser".into();
        summary.entry_count = 12;
        summary.source = SummarySource::Model;
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("Refactored the parser"));
        assert!(json.contains("\"source\":\"model\""));
    }
}
