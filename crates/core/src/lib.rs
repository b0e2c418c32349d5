//! # ctxpack Core
//!
//! Domain types, traits, and error definitions for the ctxpack context
//! compaction engine. This crate holds **no algorithms**. It defines the
//! session model that the engine and its callers share.
//!
//! ## Design Philosophy
//!
//! Every external collaborator of the engine is a trait here:
//! - [`Summarizer`]: the LLM call that turns a prompt into summary text
//! - [`SummaryStore`]: where the current summary per branch is kept
//!
//! Implementations live in `ctxpack-compaction` or in the embedding runtime,
//! so tests can swap in scripted stand-ins.

pub mod entry;
pub mod error;
pub mod strategy;
pub mod summarizer;
pub mod summary;

// Re-export key types at crate root for ergonomics
pub use entry::{
    CompactionEntry, ContentPart, EntryKind, EntryPayload, FileEntry, FileOperation,
    MessageContent, MessageEntry, MessageToolCall, OperationType, Role, SessionEntry,
    DEFAULT_BRANCH,
};
pub use error::{Error, Result, StoreError, SummarizerError};
pub use strategy::Strategy;
pub use summarizer::Summarizer;
pub use summary::{BranchSummary, SummarySource, SummaryStore};
