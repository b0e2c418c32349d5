//! Branch summarizer: turns a prefix of entries into a [`BranchSummary`].
//!
//! Results are cached by fingerprint: the branch, the number of entries and a
//! content hash over their serialized form. Identical inputs never invoke the
//! external summarizer twice. When the summarizer fails, times out or returns
//! nothing, a deterministic heuristic summary is produced instead, so a
//! summary always exists for a non-empty prefix.

use crate::dedup;
use crate::fallback::heuristic_summary;
use crate::file_stats::FileStats;
use crate::prompt::{PromptBuilder, truncate_chars};
use ctxpack_config::SummarizerConfig;
use ctxpack_core::entry::SessionEntry;
use ctxpack_core::error::SummarizerError;
use ctxpack_core::summarizer::Summarizer;
use ctxpack_core::summary::{BranchSummary, SummarySource};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// Hex SHA-256 over the serialized entries, in order.
pub fn content_hash(entries: &[SessionEntry]) -> String {
    let mut hasher = Sha256::new();
    for entry in entries {
        hasher.update(serde_json::to_vec(entry).unwrap_or_else(|_| entry.id.clone().into_bytes()));
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// Cache key for a prefix: `{branch}:{entry count}:{content hash}`.
pub fn fingerprint(branch_id: &str, entries: &[SessionEntry]) -> String {
    format!("{}:{}:{}", branch_id, entries.len(), content_hash(entries))
}

/// Summarizes branch prefixes through a pluggable [`Summarizer`].
pub struct BranchSummarizer {
    summarizer: Arc<dyn Summarizer>,
    config: SummarizerConfig,
    prompts: PromptBuilder,
    cache: RwLock<HashMap<String, BranchSummary>>,
}

impl BranchSummarizer {
    pub fn new(summarizer: Arc<dyn Summarizer>, config: SummarizerConfig) -> Self {
        let prompts = PromptBuilder::new(config.max_chars_per_entry);
        Self {
            summarizer,
            config,
            prompts,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SummarizerConfig {
        &self.config
    }

    /// Summarize `prefix` as a span of `branch_id`.
    ///
    /// An empty prefix yields [`BranchSummary::empty`] without touching the
    /// summarizer or the cache.
    pub async fn summarize(&self, prefix: &[SessionEntry], branch_id: &str) -> BranchSummary {
        if prefix.is_empty() {
            return BranchSummary::empty(branch_id);
        }

        let key = fingerprint(branch_id, prefix);
        if let Some(hit) = self.cached(&key) {
            debug!(branch = branch_id, entries = prefix.len(), "Summary cache hit");
            return hit;
        }

        let deduped = dedup::dedupe_file_operations(prefix);
        let stats = FileStats::from_entries(&deduped);
        let has_errors = prefix.iter().any(SessionEntry::is_error);
        let prompt = self.prompts.build(&deduped, &stats, has_errors);

        debug!(
            branch = branch_id,
            entries = prefix.len(),
            deduped = deduped.len(),
            prompt_chars = prompt.len(),
            summarizer = self.summarizer.name(),
            "Requesting branch summary"
        );

        let (text, source) = match self.call_summarizer(&prompt).await {
            Ok(text) => (text, SummarySource::Model),
            Err(e) => {
                warn!(
                    branch = branch_id,
                    summarizer = self.summarizer.name(),
                    error = %e,
                    "Summarizer failed, using heuristic summary"
                );
                let text = heuristic_summary(&deduped, prefix.len(), &stats, has_errors);
                (text, SummarySource::Heuristic)
            }
        };

        let summary = BranchSummary {
            branch_id: branch_id.to_string(),
            summary: truncate_chars(&text, self.config.max_summary_chars),
            entry_count: prefix.len(),
            file_operations: dedup::file_operations(&deduped),
            has_errors,
            source,
            fingerprint: key.clone(),
            created_at: prefix
                .last()
                .map(|e| e.timestamp)
                .unwrap_or_else(chrono::Utc::now),
        };

        // A concurrent call for the same key may have finished first; keep
        // whichever landed so both callers see the same summary.
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        cache.entry(key).or_insert(summary).clone()
    }

    async fn call_summarizer(&self, prompt: &str) -> Result<String, SummarizerError> {
        let text = tokio::time::timeout(self.config.timeout(), self.summarizer.summarize(prompt))
            .await
            .map_err(|_| SummarizerError::Timeout {
                timeout_secs: self.config.timeout_secs,
            })??;

        let text = text.trim();
        if text.is_empty() {
            return Err(SummarizerError::Empty);
        }
        Ok(text.to_string())
    }

    /// A cached summary for a fingerprint.
    pub fn cached(&self, fingerprint: &str) -> Option<BranchSummary> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(fingerprint)
            .cloned()
    }

    /// Drop every cached summary, so the next call for a prefix retries the
    /// summarizer (e.g. after a heuristic fallback).
    pub fn clear_cache(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ctxpack_core::entry::OperationType;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records prompts and answers with a fixed response.
    struct Scripted {
        response: Result<String, SummarizerError>,
        calls: AtomicUsize,
        last_prompt: Mutex<String>,
    }

    impl Scripted {
        fn new(response: Result<String, SummarizerError>) -> Arc<Self> {
            Arc::new(Self {
                response,
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(String::new()),
            })
        }
    }

    #[async_trait]
    impl Summarizer for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn summarize(&self, prompt: &str) -> Result<String, SummarizerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = prompt.to_string();
            self.response.clone()
        }
    }

    fn prefix() -> Vec<SessionEntry> {
        vec![
            SessionEntry::user("Add a --json flag to the CLI"),
            SessionEntry::file_operation("src/main.rs", OperationType::Read, None),
            SessionEntry::file_operation("src/main.rs", OperationType::Read, None),
            SessionEntry::file_operation("src/main.rs", OperationType::Edit, None),
            SessionEntry::assistant("Added the flag."),
        ]
    }

    #[tokio::test]
    async fn model_summary_is_used() {
        let mock = Scripted::new(Ok("  Added a --json flag in src/main.rs.  ".into()));
        let summarizer = BranchSummarizer::new(mock.clone(), SummarizerConfig::default());
        let entries = prefix();
        let summary = summarizer.summarize(&entries, "main").await;

        assert_eq!(summary.summary, "Added a --json flag in src/main.rs.");
        assert_eq!(summary.source, SummarySource::Model);
        assert_eq!(summary.entry_count, 5);
        assert_eq!(summary.file_operations.len(), 2);
        assert!(!summary.has_errors);
        assert_eq!(summary.fingerprint, fingerprint("main", &entries));
        assert_eq!(summary.created_at, entries[4].timestamp);

        let prompt = mock.last_prompt.lock().unwrap().clone();
        assert_eq!(prompt.matches("[READ src/main.rs]").count(), 1);
        assert!(prompt.contains("[EDIT src/main.rs]"));
    }

    #[tokio::test]
    async fn identical_prefix_hits_cache() {
        let mock = Scripted::new(Ok("summary".into()));
        let summarizer = BranchSummarizer::new(mock.clone(), SummarizerConfig::default());
        let entries = prefix();

        let first = summarizer.summarize(&entries, "main").await;
        let second = summarizer.summarize(&entries, "main").await;
        assert_eq!(first, second);
        assert_eq!(mock.calls.load(Ordering::SeqCst), 1);
        assert_eq!(summarizer.cache_len(), 1);
    }

    #[tokio::test]
    async fn branch_is_part_of_the_key() {
        let mock = Scripted::new(Ok("summary".into()));
        let summarizer = BranchSummarizer::new(mock.clone(), SummarizerConfig::default());
        let entries = prefix();

        summarizer.summarize(&entries, "main").await;
        summarizer.summarize(&entries, "feature").await;
        assert_eq!(mock.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failure_falls_back_to_heuristic() {
        let mock = Scripted::new(Err(SummarizerError::Failed("503".into())));
        let summarizer = BranchSummarizer::new(mock, SummarizerConfig::default());
        let summary = summarizer.summarize(&prefix(), "main").await;

        assert_eq!(summary.source, SummarySource::Heuristic);
        assert!(!summary.summary.is_empty());
        assert!(summary.summary.contains("Add a --json flag to the CLI"));
    }

    #[tokio::test]
    async fn blank_response_falls_back() {
        let mock = Scripted::new(Ok("   \n".into()));
        let summarizer = BranchSummarizer::new(mock, SummarizerConfig::default());
        let summary = summarizer.summarize(&prefix(), "main").await;
        assert_eq!(summary.source, SummarySource::Heuristic);
    }

    #[tokio::test]
    async fn clear_cache_allows_retry() {
        let mock = Scripted::new(Err(SummarizerError::Unavailable("offline".into())));
        let summarizer = BranchSummarizer::new(mock.clone(), SummarizerConfig::default());
        let entries = prefix();

        summarizer.summarize(&entries, "main").await;
        summarizer.summarize(&entries, "main").await;
        assert_eq!(mock.calls.load(Ordering::SeqCst), 1);

        summarizer.clear_cache();
        assert_eq!(summarizer.cache_len(), 0);
        summarizer.summarize(&entries, "main").await;
        assert_eq!(mock.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn long_model_output_is_capped() {
        let mock = Scripted::new(Ok("word ".repeat(1_000)));
        let config = SummarizerConfig {
            max_summary_chars: 100,
            ..SummarizerConfig::default()
        };
        let summarizer = BranchSummarizer::new(mock, config);
        let summary = summarizer.summarize(&prefix(), "main").await;
        assert!(summary.summary.chars().count() <= 100);
    }

    #[tokio::test]
    async fn error_flag_is_propagated() {
        let mock = Scripted::new(Ok("summary".into()));
        let summarizer = BranchSummarizer::new(mock, SummarizerConfig::default());
        let entries = vec![
            SessionEntry::user("run tests"),
            SessionEntry::tool_error("c1", "exit status 101"),
        ];
        assert!(summarizer.summarize(&entries, "main").await.has_errors);
    }

    #[tokio::test]
    async fn empty_prefix_skips_summarizer() {
        let mock = Scripted::new(Ok("summary".into()));
        let summarizer = BranchSummarizer::new(mock.clone(), SummarizerConfig::default());
        let summary = summarizer.summarize(&[], "main").await;
        assert!(summary.is_empty());
        assert_eq!(mock.calls.load(Ordering::SeqCst), 0);
        assert_eq!(summarizer.cache_len(), 0);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = vec![SessionEntry::user("one").with_id("1")];
        let mut b = a.clone();
        assert_eq!(fingerprint("main", &a), fingerprint("main", &b));
        b.push(SessionEntry::user("two").with_id("2"));
        assert_ne!(fingerprint("main", &a), fingerprint("main", &b));
        assert!(fingerprint("main", &a).starts_with("main:1:"));
    }
}
