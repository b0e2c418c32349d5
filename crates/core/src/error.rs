//! Error types for the ctxpack domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator seam has its own error enum.

use thiserror::Error;

/// The top-level error type for ctxpack operations outside the engine core
/// (session loading, store access, configuration plumbing).
#[derive(Debug, Error)]
pub enum Error {
    // --- Summarizer errors ---
    #[error("Summarizer error: {0}")]
    Summarizer(#[from] SummarizerError),

    // --- Store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Session files ---
    #[error("Invalid session entry at line {line}: {reason}")]
    InvalidEntry { line: usize, reason: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- I/O ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the external summarizer.
///
/// The engine never propagates these; every variant ends in the heuristic
/// fallback summary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SummarizerError {
    #[error("Summarizer call failed: {0}")]
    Failed(String),

    #[error("Summarizer returned an empty response")]
    Empty,

    #[error("Summarizer timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Summarizer unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Branch not found: {0}")]
    BranchNotFound(String),
}
