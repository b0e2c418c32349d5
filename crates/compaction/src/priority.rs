//! Priority classification of session entries.
//!
//! Maps each entry to an ordinal importance class. The class drives graded
//! compression of the summarization prompt: important entries keep more of
//! their text, decorative ones are cut short or left out.

use ctxpack_core::entry::{EntryPayload, Role, SessionEntry};
use serde::{Deserialize, Serialize};

/// Importance of an entry, lowest first so that `Ord` ranks `Critical` highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Discard,
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Discard => "DISCARD",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        };
        f.write_str(name)
    }
}

impl Priority {
    /// Character cap for an entry of this class, given the base cap.
    ///
    /// `None` means the entry is omitted from the prompt.
    pub fn char_cap(&self, base: usize) -> Option<usize> {
        match self {
            Self::Critical => Some(base.saturating_mul(5) / 4),
            Self::High => Some(base),
            Self::Medium => Some(base.saturating_mul(3) / 4),
            Self::Low => Some((base.saturating_mul(3) / 8).max(1)),
            Self::Discard => None,
        }
    }
}

/// Classify an entry.
///
/// Rules, first match wins:
/// 1. system messages, and tool results flagged as errors → `Critical`
/// 2. user messages, and assistant messages with pending tool calls → `High`
/// 3. tool results without an error flag → `High`
/// 4. blank assistant messages → `Discard`
/// 5. other assistant messages → `Medium`
/// 6. everything else → `Low`
pub fn classify(entry: &SessionEntry) -> Priority {
    let EntryPayload::Message(msg) = &entry.payload else {
        return Priority::Low;
    };

    match msg.role {
        Role::System => Priority::Critical,
        Role::Tool if entry.is_error() => Priority::Critical,
        Role::Tool => Priority::High,
        Role::User => Priority::High,
        Role::Assistant if !msg.tool_calls.is_empty() => Priority::High,
        Role::Assistant if msg.content.is_blank() => Priority::Discard,
        Role::Assistant => Priority::Medium,
    }
}
