//! The context compaction engine.
//!
//! Keeps an ever-growing agent transcript inside a fixed token budget:
//!
//! 1. **Estimate** the token cost of every entry (pure arithmetic, no tokenizer)
//! 2. **Select** a cut point that frees enough budget without splitting a
//!    user/assistant exchange or a tool call from its result
//! 3. **Summarize** the prefix before the cut, with file history deduplicated
//!    and every entry truncated by priority
//! 4. **Splice** one compaction record in front of the preserved suffix
//!
//! | Stage | Module | Failure mode |
//! |-------|--------|--------------|
//! | Estimation | [`token`] | Never fails |
//! | Classification | [`priority`] | Never fails |
//! | Deduplication | [`dedup`] | Never fails |
//! | Cut point | [`cut_point`] | "No viable cut" is a no-op |
//! | Summary | [`summarizer`] | Falls back to a heuristic summary |
//! | Orchestration | [`compactor`] | Returns the input unchanged |

pub mod adapters;
pub mod compactor;
pub mod cut_point;
pub mod dedup;
pub mod fallback;
pub mod file_stats;
pub mod priority;
pub mod prompt;
pub mod store;
pub mod summarizer;
pub mod token;

pub use adapters::{BlockingSummarizer, FnSummarizer, OfflineSummarizer};
pub use compactor::{CompactionReport, CompactionResult, Compactor};
pub use cut_point::{
    find_cut_point, is_safe_boundary, max_cut_index, CutPoint, CutPointSelector, CutReason,
};
pub use dedup::dedupe_file_operations;
pub use file_stats::FileStats;
pub use priority::{classify, Priority};
pub use store::InMemorySummaryStore;
pub use summarizer::{fingerprint, BranchSummarizer};
pub use token::{estimate_entries, estimate_entry, estimate_tokens};
