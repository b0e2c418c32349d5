//! Deterministic summary used when the external summarizer is unavailable.

use crate::file_stats::FileStats;
use crate::prompt::{flatten_whitespace, truncate_chars};
use ctxpack_core::entry::{Role, SessionEntry};

const TOPIC_CHARS: usize = 80;
const MAX_TOPICS: usize = 2;
const CARRIED_SUMMARY_CHARS: usize = 300;

/// Build a summary from counts, the first user requests and file activity.
///
/// `entries` is the deduplicated span; `summarized` is how many entries the
/// original prefix held. Never empty for a non-empty prefix.
pub fn heuristic_summary(
    entries: &[SessionEntry],
    summarized: usize,
    stats: &FileStats,
    has_errors: bool,
) -> String {
    let count = |role: Role| entries.iter().filter(|e| e.is_role(role)).count();
    let (users, assistants, tools) = (count(Role::User), count(Role::Assistant), count(Role::Tool));

    let mut parts = vec![format!(
        "Summarized {} entries: {} user, {} assistant, {} tool messages.",
        summarized,
        users,
        assistants,
        tools
    )];

    if let Some(previous) = entries
        .iter()
        .filter_map(SessionEntry::as_compaction)
        .map(|record| record.summary.trim())
        .rfind(|s| !s.is_empty())
    {
        parts.push(format!(
            "Earlier context: {}",
            truncate_chars(&flatten_whitespace(previous), CARRIED_SUMMARY_CHARS)
        ));
    }

    let topics: Vec<String> = entries
        .iter()
        .filter(|e| e.is_role(Role::User))
        .filter_map(SessionEntry::as_message)
        .map(|msg| flatten_whitespace(&msg.content.to_text()))
        .filter(|text| !text.is_empty())
        .take(MAX_TOPICS)
        .map(|text| format!("\"{}\"", truncate_chars(&text, TOPIC_CHARS)))
        .collect();
    if !topics.is_empty() {
        parts.push(format!("Topics: {}.", topics.join("; ")));
    }

    if !stats.is_empty() {
        let mut files = format!(
            "Files: {} operation(s) across {} path(s)",
            stats.total_operations, stats.unique_paths
        );
        if !stats.most_modified.is_empty() {
            let listed: Vec<String> = stats
                .most_modified
                .iter()
                .map(|(path, n)| format!("{path} ({n})"))
                .collect();
            files.push_str(&format!("; most modified: {}", listed.join(", ")));
        }
        files.push('.');
        parts.push(files);
    }

    if has_errors {
        parts.push("Some tool calls in this span failed.".into());
    }

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxpack_core::entry::OperationType;

    #[test]
    fn counts_roles_and_topics() {
        let entries = vec![
            SessionEntry::user("Fix the failing parser test"),
            SessionEntry::assistant("Looking at it"),
            SessionEntry::tool_result("c1", "ok"),
            SessionEntry::user("Also bump the version"),
            SessionEntry::user("And update the changelog"),
        ];
        let text = heuristic_summary(&entries, entries.len(), &FileStats::default(), false);
        assert!(text.starts_with("Summarized 5 entries: 3 user, 1 assistant, 1 tool messages."));
        assert!(text.contains("\"Fix the failing parser test\"; \"Also bump the version\""));
        assert!(!text.contains("changelog"));
        assert!(!text.contains("failed"));
    }

    #[test]
    fn mentions_files_and_errors() {
        let entries = vec![
            SessionEntry::file_operation("src/lib.rs", OperationType::Edit, None),
            SessionEntry::tool_error("c1", "boom"),
        ];
        let stats = FileStats::from_entries(&entries);
        let text = heuristic_summary(&entries, entries.len(), &stats, true);
        assert!(text.contains("Files: 1 operation(s) across 1 path(s); most modified: src/lib.rs (1)."));
        assert!(text.contains("Some tool calls in this span failed."));
    }

    #[test]
    fn carries_previous_summary() {
        let entries = vec![
            SessionEntry::compaction("Set up CI and the release workflow.", 30),
            SessionEntry::user("next step"),
        ];
        let text = heuristic_summary(&entries, entries.len(), &FileStats::default(), false);
        assert!(text.contains("Earlier context: Set up CI and the release workflow."));
    }

    #[test]
    fn non_message_prefix_is_still_described() {
        let entries = vec![SessionEntry::model_change("gpt-4o")];
        let text = heuristic_summary(&entries, entries.len(), &FileStats::default(), false);
        assert!(!text.is_empty());
        assert!(text.contains("Summarized 1 entries"));
    }

    #[test]
    fn counts_the_original_prefix() {
        let read = || SessionEntry::file_operation("src/lib.rs", OperationType::Read, None);
        let prefix = vec![read(), read(), read(), SessionEntry::user("check the lib")];
        let deduped = crate::dedup::dedupe_file_operations(&prefix);
        assert_eq!(deduped.len(), 2);

        let text = heuristic_summary(&deduped, prefix.len(), &FileStats::from_entries(&deduped), false);
        assert!(text.starts_with("Summarized 4 entries: 1 user, 0 assistant, 0 tool messages."));
    }
}
