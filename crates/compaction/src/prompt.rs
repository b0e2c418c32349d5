//! Summarization prompt construction.
//!
//! The prompt is bounded regardless of input size: every message is cut to a
//! character cap scaled by its [`Priority`], file operations render as one
//! short line each, and earlier compaction summaries are lifted into an
//! `EXISTING SUMMARY` section so the model merges rather than re-derives.

use crate::file_stats::FileStats;
use crate::priority::{self, Priority};
use ctxpack_core::entry::{EntryPayload, SessionEntry};

/// Instructions given to the summarizer ahead of the rendered history.
pub const SUMMARIZATION_PROMPT: &str = "\
Summarize the following coding-agent session history concisely. Focus on:
- What the user asked for and what was accomplished
- Files created, modified or deleted
- Key findings and decisions made
- Failed approaches and the errors they produced
- What remains to be done

Rules:
- Only include facts stated in the history. Do not infer or extrapolate.
- Preserve file paths, function names and error messages verbatim.
- If an existing summary is present, merge the new history into it and return a \
  single standalone summary that replaces it.";

/// Renders a summarized prefix into a bounded prompt.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    max_chars_per_entry: usize,
}

impl PromptBuilder {
    pub fn new(max_chars_per_entry: usize) -> Self {
        Self {
            max_chars_per_entry,
        }
    }

    /// Build the prompt for a (deduplicated) prefix.
    pub fn build(&self, entries: &[SessionEntry], stats: &FileStats, has_errors: bool) -> String {
        let mut prompt = String::from(SUMMARIZATION_PROMPT);
        prompt.push_str("\n\n");

        let existing: Vec<&str> = entries
            .iter()
            .filter_map(SessionEntry::as_compaction)
            .map(|record| record.summary.as_str())
            .filter(|s| !s.trim().is_empty())
            .collect();
        if !existing.is_empty() {
            prompt.push_str("=== EXISTING SUMMARY ===\n");
            prompt.push_str(&existing.join("\n\n"));
            prompt.push_str("\n\n");
        }

        prompt.push_str("=== HISTORY ===\n");
        for entry in entries {
            if let Some(line) = self.render_entry(entry) {
                prompt.push_str(&line);
                prompt.push('\n');
            }
        }

        let rendered_stats = stats.render();
        if !rendered_stats.is_empty() {
            prompt.push_str("\n=== FILE STATISTICS ===\n");
            prompt.push_str(&rendered_stats);
        }

        if has_errors {
            prompt.push_str(
                "\nNote: this history contains failed tool calls. Keep their error messages.\n",
            );
        }

        prompt
    }

    /// Render one entry, or `None` when it carries nothing worth sending.
    pub fn render_entry(&self, entry: &SessionEntry) -> Option<String> {
        match &entry.payload {
            EntryPayload::Message(msg) => {
                let priority = priority::classify(entry);
                let cap = priority.char_cap(self.max_chars_per_entry)?;
                let mut line = format!(
                    "{}: {}",
                    msg.role.label(),
                    truncate_chars(&flatten_whitespace(&msg.content.to_text()), cap)
                );
                if !msg.tool_calls.is_empty() {
                    let names: Vec<&str> = msg.tool_calls.iter().map(|c| c.name.as_str()).collect();
                    line.push_str(&format!(" [tool calls: {}]", names.join(", ")));
                }
                if entry.is_error() && priority == Priority::Critical {
                    line.push_str(" [error]");
                }
                Some(line)
            }
            EntryPayload::FileOperation(file) => Some(format!(
                "[{} {}]",
                file.operation.operation_type.label(),
                file.operation.path
            )),
            EntryPayload::CompactionRecord(_) => None,
            EntryPayload::ModelChange { model, .. } => Some(format!("[MODEL CHANGE {model}]")),
            EntryPayload::ThinkingLevelChange { level } => {
                Some(format!("[THINKING LEVEL {level}]"))
            }
            EntryPayload::Custom { custom_type, .. } => Some(format!("[CUSTOM {custom_type}]")),
        }
    }
}

/// Cut `text` to at most `max_chars` characters, marking the cut with `...`.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let kept: String = text.chars().take(max_chars - 3).collect();
    format!("{}...", kept.trim_end())
}

/// Collapse runs of whitespace (including newlines) into single spaces.
pub(crate) fn flatten_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
