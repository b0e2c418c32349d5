//! Cut-point selection.
//!
//! Given an ordered entry sequence and a token budget, finds the index that
//! separates the prefix to summarize from the suffix kept verbatim.
//!
//! # Algorithm
//!
//! 1. Empty input → index 0 (`empty_entries`).
//! 2. Total cost within `max_tokens - reserve_tokens` → index = length
//!    (`no_cut_needed`).
//! 3. Walk from the front accumulating cost until the excess is covered,
//!    plus any overhead the caller needs room for (the compaction record).
//!    The walk never passes `max(length - min_keep_count, 1)`.
//! 4. Adjust to a clean boundary within a small window: first a point right
//!    before a compaction record or model change, then a point right after a
//!    finished assistant reply. A point that splits a user message from its
//!    reply, or a tool call from its result, is never returned.
//!
//! An index of 0 or ≥ length means no cut.

use crate::token;
use ctxpack_core::entry::{EntryKind, Role, SessionEntry};
use ctxpack_core::Strategy;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Entries searched on either side of the raw cut point.
pub const DEFAULT_BOUNDARY_WINDOW: usize = 3;

/// Why a cut point was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutReason {
    /// Nothing to cut
    EmptyEntries,
    /// Sequence already fits the budget
    NoCutNeeded,
    /// Raw budget point was already a clean boundary
    BudgetExceeded,
    /// Raw point moved to a clean boundary
    BoundaryAdjusted,
    /// Walk stopped at the keep floor before the budget was met
    FloorReached,
    /// No boundary leaves both a prefix and a suffix
    NoViableCut,
    /// Prefix would only re-summarize existing summaries
    OnlyCompactionRecords,
}

impl CutReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyEntries => "empty_entries",
            Self::NoCutNeeded => "no_cut_needed",
            Self::BudgetExceeded => "budget_exceeded",
            Self::BoundaryAdjusted => "boundary_adjusted",
            Self::FloorReached => "floor_reached",
            Self::NoViableCut => "no_viable_cut",
            Self::OnlyCompactionRecords => "only_compaction_records",
        }
    }
}

impl std::fmt::Display for CutReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The selected cut point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutPoint {
    /// Entries before this index are summarized
    pub index: usize,
    pub reason: CutReason,
    /// Estimated tokens of the whole input
    pub tokens_before: usize,
    /// Estimated tokens of the kept suffix
    pub tokens_after: usize,
}

impl CutPoint {
    /// Whether the cut removes something and keeps something.
    pub fn is_effective(&self, len: usize) -> bool {
        self.index > 0 && self.index < len
    }

    fn uncut(index: usize, reason: CutReason, total: usize) -> Self {
        Self {
            index,
            reason,
            tokens_before: total,
            tokens_after: total,
        }
    }
}

/// Cut-point search with tunable floor and boundary window.
#[derive(Debug, Clone)]
pub struct CutPointSelector {
    window: usize,
}

impl Default for CutPointSelector {
    fn default() -> Self {
        Self {
            window: DEFAULT_BOUNDARY_WINDOW,
        }
    }
}

impl CutPointSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Search this many entries either side of the raw point.
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Find the cut point for `entries` under the given budget, keeping the
    /// strategy's trailing-entry floor.
    pub fn select(
        &self,
        entries: &[SessionEntry],
        max_tokens: usize,
        reserve_tokens: usize,
        strategy: Strategy,
    ) -> CutPoint {
        self.select_within(
            entries,
            max_tokens.saturating_sub(reserve_tokens),
            strategy.min_keep_count(),
            0,
        )
    }

    /// Find the cut point that leaves room for `overhead` extra tokens next
    /// to the kept suffix, keeping at least `min_keep` trailing entries.
    pub fn select_within(
        &self,
        entries: &[SessionEntry],
        budget: usize,
        min_keep: usize,
        overhead: usize,
    ) -> CutPoint {
        if entries.is_empty() {
            return CutPoint::uncut(0, CutReason::EmptyEntries, 0);
        }

        let costs: Vec<usize> = entries.iter().map(token::estimate_entry).collect();
        let total: usize = costs.iter().sum();
        let len = entries.len();

        if total + overhead <= budget {
            return CutPoint::uncut(len, CutReason::NoCutNeeded, total);
        }

        let needed = total + overhead - budget;
        let max_cut = max_cut_index(len, min_keep);

        let mut raw = max_cut;
        let mut clamped = true;
        let mut accumulated = 0;
        for (i, cost) in costs.iter().enumerate().take(max_cut) {
            accumulated += cost;
            if accumulated >= needed {
                raw = i + 1;
                clamped = false;
                break;
            }
        }

        let adjusted = adjust_to_boundary(entries, raw, max_cut, self.window);

        debug!(
            total,
            budget,
            overhead,
            needed,
            min_keep,
            raw,
            adjusted,
            "Cut point search"
        );

        if adjusted == 0 || adjusted >= len {
            return CutPoint::uncut(0, CutReason::NoViableCut, total);
        }

        if entries[..adjusted]
            .iter()
            .all(|e| e.kind() == EntryKind::CompactionRecord)
        {
            return CutPoint::uncut(0, CutReason::OnlyCompactionRecords, total);
        }

        let removed: usize = costs[..adjusted].iter().sum();
        let reason = if adjusted != raw {
            CutReason::BoundaryAdjusted
        } else if clamped {
            CutReason::FloorReached
        } else {
            CutReason::BudgetExceeded
        };

        CutPoint {
            index: adjusted,
            reason,
            tokens_before: total,
            tokens_after: total - removed,
        }
    }
}

/// Deepest cut that still keeps `min_keep` trailing entries (at least 1).
pub fn max_cut_index(len: usize, min_keep: usize) -> usize {
    len.saturating_sub(min_keep).max(1)
}

/// Find the cut point with the default boundary window and the strategy's floor.
pub fn find_cut_point(
    entries: &[SessionEntry],
    max_tokens: usize,
    reserve_tokens: usize,
    strategy: Strategy,
) -> CutPoint {
    CutPointSelector::default().select(entries, max_tokens, reserve_tokens, strategy)
}

/// Whether cutting before `index` leaves every exchange intact.
///
/// Unsafe cuts separate a user message from the assistant reply right after
/// it, strand a tool result from its call, or leave an assistant tool call
/// without its result.
pub fn is_safe_boundary(entries: &[SessionEntry], index: usize) -> bool {
    if index == 0 || index >= entries.len() {
        return false;
    }
    let prev = &entries[index - 1];
    let next = &entries[index];

    if prev.is_role(Role::User) && next.is_role(Role::Assistant) {
        return false;
    }
    if next.is_role(Role::Tool) {
        return false;
    }
    !prev.has_pending_tool_calls()
}

fn is_marker_boundary(entries: &[SessionEntry], index: usize) -> bool {
    matches!(
        entries[index].kind(),
        EntryKind::CompactionRecord | EntryKind::ModelChange
    )
}

fn ends_exchange(entries: &[SessionEntry], index: usize) -> bool {
    let prev = &entries[index - 1];
    prev.is_role(Role::Assistant) && !prev.has_pending_tool_calls()
}

/// Candidates ordered by distance from `raw`, later first on ties.
fn window_candidates(raw: usize, max_cut: usize, window: usize) -> Vec<usize> {
    let lo = raw.saturating_sub(window).max(1);
    let hi = (raw + window).min(max_cut);
    let mut out = Vec::with_capacity(window * 2 + 1);
    for distance in 0..=window {
        let later = raw + distance;
        if later <= hi {
            out.push(later);
        }
        if distance > 0 && raw >= distance && raw - distance >= lo {
            out.push(raw - distance);
        }
    }
    out
}

fn adjust_to_boundary(entries: &[SessionEntry], raw: usize, max_cut: usize, window: usize) -> usize {
    let candidates = window_candidates(raw, max_cut, window);
    let safe: Vec<usize> = candidates
        .iter()
        .copied()
        .filter(|&c| is_safe_boundary(entries, c))
        .collect();

    if let Some(&c) = safe.iter().find(|&&c| is_marker_boundary(entries, c)) {
        return c;
    }
    if let Some(&c) = safe.iter().find(|&&c| ends_exchange(entries, c)) {
        return c;
    }
    if let Some(&c) = safe.first() {
        return c;
    }

    // Nothing usable in the window: back off until the prefix ends cleanly.
    let start = candidates.iter().copied().min().unwrap_or(raw);
    (1..start)
        .rev()
        .find(|&c| is_safe_boundary(entries, c))
        .unwrap_or(0)
}
