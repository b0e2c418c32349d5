//! Compaction orchestrator: the engine's entry point.
//!
//! One call decides whether compaction is needed, picks a cut point,
//! summarizes the prefix and splices a single compaction record in front of
//! the preserved suffix. The input slice is never touched; the compacted
//! sequence is built in a fresh buffer.
//!
//! `compact` never fails. A summarizer outage degrades to the heuristic
//! summary, a store failure is logged, and "nothing to cut" returns the
//! input unchanged. Callers see what happened through [`CompactionReport`].

use crate::cut_point::{max_cut_index, CutPoint, CutPointSelector, CutReason};
use crate::prompt::truncate_chars;
use crate::store::InMemorySummaryStore;
use crate::summarizer::BranchSummarizer;
use crate::token;
use ctxpack_config::{AppConfig, CompactionConfig, ConfigError, SummarizerConfig};
use ctxpack_core::entry::{CompactionEntry, EntryPayload, SessionEntry};
use ctxpack_core::strategy::Strategy;
use ctxpack_core::summarizer::Summarizer;
use ctxpack_core::summary::{BranchSummary, SummarySource, SummaryStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Re-selections allowed when the compaction record does not fit.
const MAX_DEEPENING_PASSES: usize = 4;

/// What a compaction call did, for logs and metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactionReport {
    pub was_compacted: bool,
    pub original_tokens: usize,
    pub final_tokens: usize,
    /// `final_tokens / original_tokens` (1.0 when nothing changed)
    pub compression_ratio: f64,
    /// Entries replaced by the compaction record
    pub entries_removed: usize,
    /// `None` when usage was below the compaction threshold
    pub cut_reason: Option<CutReason>,
    pub summary_source: SummarySource,
    pub has_errors: bool,
}

impl CompactionReport {
    fn unchanged(tokens: usize, cut_reason: Option<CutReason>) -> Self {
        Self {
            was_compacted: false,
            original_tokens: tokens,
            final_tokens: tokens,
            compression_ratio: 1.0,
            entries_removed: 0,
            cut_reason,
            summary_source: SummarySource::None,
            has_errors: false,
        }
    }

    /// One-line rendering, e.g. for a CLI or a log sink.
    pub fn to_log_string(&self) -> String {
        let reason = self.cut_reason.as_ref().map_or("below_threshold", CutReason::as_str);
        if !self.was_compacted {
            return format!(
                "compaction skipped ({reason}): {} tokens",
                self.original_tokens
            );
        }
        format!(
            "compacted {} entries ({reason}, {} summary): {} -> {} tokens ({:.1}% of original)",
            self.entries_removed,
            summary_source_label(self.summary_source),
            self.original_tokens,
            self.final_tokens,
            self.compression_ratio * 100.0
        )
    }
}

/// The outcome of [`Compactor::compact`].
#[derive(Debug, Clone)]
pub struct CompactionResult {
    /// The compacted sequence (the input unchanged on a no-op)
    pub entries: Vec<SessionEntry>,
    /// Summary of the removed prefix (empty on a no-op)
    pub summary: BranchSummary,
    pub report: CompactionReport,
}

/// Keeps a session inside its token budget.
pub struct Compactor {
    config: CompactionConfig,
    selector: CutPointSelector,
    summarizer: BranchSummarizer,
    store: Arc<dyn SummaryStore>,
}

impl Compactor {
    /// Build a compactor. Invalid budgets are rejected here, not mid-compaction.
    pub fn new(
        config: CompactionConfig,
        summarizer_config: SummarizerConfig,
        summarizer: Arc<dyn Summarizer>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        summarizer_config.validate()?;

        let selector = CutPointSelector::new().with_window(config.boundary_window);

        Ok(Self {
            config,
            selector,
            summarizer: BranchSummarizer::new(summarizer, summarizer_config),
            store: Arc::new(InMemorySummaryStore::new()),
        })
    }

    pub fn from_app_config(
        config: &AppConfig,
        summarizer: Arc<dyn Summarizer>,
    ) -> Result<Self, ConfigError> {
        Self::new(config.compaction.clone(), config.summarizer.clone(), summarizer)
    }

    /// Replace the default in-memory summary store.
    pub fn with_store(mut self, store: Arc<dyn SummaryStore>) -> Self {
        self.store = store;
        self
    }

    pub fn config(&self) -> &CompactionConfig {
        &self.config
    }

    pub fn branch_summarizer(&self) -> &BranchSummarizer {
        &self.summarizer
    }

    pub fn store(&self) -> &Arc<dyn SummaryStore> {
        &self.store
    }

    /// Whether estimated usage has reached `threshold_ratio × max_tokens`.
    pub fn should_compact(&self, entries: &[SessionEntry]) -> bool {
        token::estimate_entries(entries) as f64 >= self.config.trigger_tokens()
    }

    /// Compact with the configured default strategy.
    pub async fn compact_default(&self, entries: &[SessionEntry], branch_id: &str) -> CompactionResult {
        self.compact(entries, branch_id, self.config.strategy).await
    }

    /// Compact `entries` of `branch_id` under `strategy`.
    pub async fn compact(
        &self,
        entries: &[SessionEntry],
        branch_id: &str,
        strategy: Strategy,
    ) -> CompactionResult {
        let original_tokens = token::estimate_entries(entries);
        if (original_tokens as f64) < self.config.trigger_tokens() {
            debug!(
                branch = branch_id,
                tokens = original_tokens,
                trigger = self.config.trigger_tokens(),
                "Below compaction threshold"
            );
            return unchanged(entries, branch_id, original_tokens, None);
        }

        let budget = self.config.effective_budget();
        let min_keep = self.config.min_keep_count_for(strategy);
        let max_cut = max_cut_index(entries.len(), min_keep);

        let mut cut = self.selector.select_within(entries, budget, min_keep, 0);
        if !cut.is_effective(entries.len()) {
            debug!(branch = branch_id, reason = %cut.reason, "No effective cut");
            return unchanged(entries, branch_id, original_tokens, Some(cut.reason));
        }

        // The record shares the budget with the suffix: cut deeper until it
        // fits or the floor stops us.
        let mut summary = self.summarizer.summarize(&entries[..cut.index], branch_id).await;
        for _ in 0..MAX_DEEPENING_PASSES {
            let record_tokens =
                token::estimate_tokens(&summary.summary) + token::ENTRY_OVERHEAD_TOKENS;
            if cut.tokens_after + record_tokens <= budget || cut.index >= max_cut {
                break;
            }
            let deeper = self
                .selector
                .select_within(entries, budget, min_keep, record_tokens);
            if !deeper.is_effective(entries.len()) || deeper.index <= cut.index {
                break;
            }
            debug!(
                branch = branch_id,
                from = cut.index,
                to = deeper.index,
                record_tokens,
                "Cutting deeper to fit the compaction record"
            );
            cut = deeper;
            summary = self.summarizer.summarize(&entries[..cut.index], branch_id).await;
        }

        let record_floor = cut.tokens_after + token::ENTRY_OVERHEAD_TOKENS;
        if let Some(room) = budget.checked_sub(record_floor) {
            summary.summary = fit_summary(&summary.summary, room);
        }

        let (prefix, suffix) = entries.split_at(cut.index);
        let mut compacted = Vec::with_capacity(suffix.len() + 1);
        compacted.push(compaction_record(prefix, &summary, branch_id, &cut));
        compacted.extend_from_slice(suffix);

        let final_tokens = token::estimate_entries(&compacted);
        if final_tokens > budget {
            cut.reason = CutReason::FloorReached;
        }
        if let Some(record) = compacted.first_mut() {
            record
                .metadata
                .insert("tokens_after".into(), final_tokens.into());
        }

        if let Err(e) = self.store.put(summary.clone()).await {
            warn!(
                branch = branch_id,
                store = self.store.name(),
                error = %e,
                "Failed to persist branch summary"
            );
        }

        let report = CompactionReport {
            was_compacted: true,
            original_tokens,
            final_tokens,
            compression_ratio: ratio(final_tokens, original_tokens),
            entries_removed: cut.index,
            cut_reason: Some(cut.reason),
            summary_source: summary.source,
            has_errors: summary.has_errors,
        };

        info!(
            branch = branch_id,
            strategy = %strategy,
            removed = cut.index,
            kept = suffix.len(),
            original_tokens,
            final_tokens,
            reason = %cut.reason,
            "Compaction complete"
        );

        CompactionResult {
            entries: compacted,
            summary,
            report,
        }
    }

    /// The current summary recorded for a branch.
    pub async fn current_summary(&self, branch_id: &str) -> Option<BranchSummary> {
        match self.store.latest(branch_id).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(branch = branch_id, error = %e, "Failed to read branch summary");
                None
            }
        }
    }
}

fn unchanged(
    entries: &[SessionEntry],
    branch_id: &str,
    tokens: usize,
    cut_reason: Option<CutReason>,
) -> CompactionResult {
    CompactionResult {
        entries: entries.to_vec(),
        summary: BranchSummary::empty(branch_id),
        report: CompactionReport::unchanged(tokens, cut_reason),
    }
}

/// Shorten `text` until it estimates to at most `max_tokens`.
fn fit_summary(text: &str, max_tokens: usize) -> String {
    if token::estimate_tokens(text) <= max_tokens {
        return text.to_string();
    }
    let mut chars = text.chars().count();
    while chars > 0 {
        chars = (chars * 3 / 4).min(chars - 1);
        let candidate = truncate_chars(text, chars);
        if token::estimate_tokens(&candidate) <= max_tokens {
            return candidate;
        }
    }
    String::new()
}

fn ratio(final_tokens: usize, original_tokens: usize) -> f64 {
    if original_tokens == 0 {
        1.0
    } else {
        final_tokens as f64 / original_tokens as f64
    }
}

/// The record standing in for `prefix`. Identical prefixes yield identical
/// records: the id comes from the fingerprint and the timestamp from the
/// last summarized entry.
fn compaction_record(
    prefix: &[SessionEntry],
    summary: &BranchSummary,
    branch_id: &str,
    cut: &CutPoint,
) -> SessionEntry {
    let hash = summary.fingerprint.rsplit(':').next().unwrap_or_default();
    let short = &hash[..hash.len().min(16)];

    let mut record = SessionEntry::new(EntryPayload::CompactionRecord(CompactionEntry {
        summary: summary.summary.clone(),
        entries_summarized: prefix.len(),
    }))
    .with_id(format!("compaction-{short}"))
    .on_branch(branch_id)
    .with_metadata("file_operations_count", summary.file_operations.len())
    .with_metadata("tokens_before", cut.tokens_before)
    .with_metadata("fingerprint", summary.fingerprint.clone())
    .with_metadata("summary_source", summary_source_label(summary.source))
    .with_metadata("has_errors", summary.has_errors);

    if let Some(last) = prefix.last() {
        record = record.at(last.timestamp);
    }
    record
}

fn summary_source_label(source: SummarySource) -> &'static str {
    match source {
        SummarySource::Model => "model",
        SummarySource::Heuristic => "heuristic",
        SummarySource::None => "none",
    }
}
