//! In-memory summary store, for tests and ephemeral sessions.

use async_trait::async_trait;
use ctxpack_core::error::StoreError;
use ctxpack_core::summary::{BranchSummary, SummaryStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Keeps every summary per branch in memory, newest last.
pub struct InMemorySummaryStore {
    branches: Arc<RwLock<HashMap<String, Vec<BranchSummary>>>>,
}

impl InMemorySummaryStore {
    pub fn new() -> Self {
        Self {
            branches: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemorySummaryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SummaryStore for InMemorySummaryStore {
    fn name(&self) -> &str { "in_memory" }

    async fn put(&self, summary: BranchSummary) -> Result<(), StoreError> {
        let mut branches = self.branches.write().await;
        let history = branches.entry(summary.branch_id.clone()).or_default();
        // Re-running a cached compaction stores the same summary again
        if history
            .last()
            .is_some_and(|last| !last.fingerprint.is_empty() && last.fingerprint == summary.fingerprint)
        {
            return Ok(());
        }
        history.push(summary);
        Ok(())
    }

    async fn latest(&self, branch_id: &str) -> Result<Option<BranchSummary>, StoreError> {
        let branches = self.branches.read().await;
        Ok(branches.get(branch_id).and_then(|h| h.last().cloned()))
    }

    async fn history(&self, branch_id: &str) -> Result<Vec<BranchSummary>, StoreError> {
        let branches = self.branches.read().await;
        Ok(branches.get(branch_id).cloned().unwrap_or_default())
    }

    async fn clear(&self, branch_id: &str) -> Result<bool, StoreError> {
        Ok(self.branches.write().await.remove(branch_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(branch: &str, text: &str, fingerprint: &str) -> BranchSummary {
        let mut s = BranchSummary::empty(branch);
        s.summary = text.into();
        s.entry_count = 3;
        s.fingerprint = fingerprint.into();
        s
    }

    #[tokio::test]
    async fn latest_is_newest_put() {
        let store = InMemorySummaryStore::new();
        store.put(summary("main", "first", "a")).await.unwrap();
        store.put(summary("main", "second", "b")).await.unwrap();

        let latest = store.latest("main").await.unwrap().unwrap();
        assert_eq!(latest.summary, "second");
        assert_eq!(store.history("main").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn branches_are_isolated() {
        let store = InMemorySummaryStore::new();
        store.put(summary("main", "main work", "a")).await.unwrap();
        store.put(summary("feature", "feature work", "b")).await.unwrap();

        assert_eq!(store.latest("feature").await.unwrap().unwrap().summary, "feature work");
        assert!(store.latest("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn repeated_fingerprint_is_stored_once() {
        let store = InMemorySummaryStore::new();
        store.put(summary("main", "same", "a")).await.unwrap();
        store.put(summary("main", "same", "a")).await.unwrap();
        assert_eq!(store.history("main").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn clear_removes_branch() {
        let store = InMemorySummaryStore::new();
        store.put(summary("main", "x", "a")).await.unwrap();
        assert!(store.clear("main").await.unwrap());
        assert!(!store.clear("main").await.unwrap());
        assert!(store.history("main").await.unwrap().is_empty());
    }
}
