//! Aggregate file statistics for a summarized prefix.
//!
//! Gives the summarizer a compact picture of where work happened: which
//! paths were modified most and which file types were touched.

use ctxpack_core::entry::SessionEntry;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// How many most-modified paths are reported.
pub const TOP_PATHS: usize = 5;

/// File activity over a span of entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileStats {
    /// Paths by number of writes + edits + deletes, most first (ties by path)
    pub most_modified: Vec<(String, usize)>,
    /// File extension → operation count (`(none)` for extensionless paths)
    pub extensions: BTreeMap<String, usize>,
    /// Total file operations seen
    pub total_operations: usize,
    /// Distinct paths seen
    pub unique_paths: usize,
}

impl FileStats {
    /// Collect statistics from an entry span. Non-file entries are ignored.
    pub fn from_entries(entries: &[SessionEntry]) -> Self {
        let mut modified: HashMap<&str, usize> = HashMap::new();
        let mut extensions: BTreeMap<String, usize> = BTreeMap::new();
        let mut paths: BTreeSet<&str> = BTreeSet::new();
        let mut total_operations = 0;

        for op in entries.iter().filter_map(SessionEntry::as_file_operation) {
            total_operations += 1;
            paths.insert(op.path.as_str());
            *extensions.entry(extension_of(&op.path)).or_default() += 1;
            if op.operation_type.is_modification() {
                *modified.entry(op.path.as_str()).or_default() += 1;
            }
        }

        let mut most_modified: Vec<(String, usize)> = modified
            .into_iter()
            .map(|(path, count)| (path.to_string(), count))
            .collect();
        most_modified.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        most_modified.truncate(TOP_PATHS);

        Self {
            most_modified,
            extensions,
            total_operations,
            unique_paths: paths.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_operations == 0
    }

    /// Render as prompt lines. Empty when there were no file operations.
    pub fn render(&self) -> String {
        if self.is_empty() {
            return String::new();
        }

        let mut out = format!(
            "File operations: {} across {} path(s)\n",
            self.total_operations, self.unique_paths
        );

        if !self.most_modified.is_empty() {
            let listed: Vec<String> = self
                .most_modified
                .iter()
                .map(|(path, count)| format!("{path} ({count})"))
                .collect();
            out.push_str(&format!("Most modified: {}\n", listed.join(", ")));
        }

        let histogram: Vec<String> = self
            .extensions
            .iter()
            .map(|(ext, count)| format!("{ext}={count}"))
            .collect();
        out.push_str(&format!("Extensions: {}\n", histogram.join(", ")));
        out
    }
}

fn extension_of(path: &str) -> String {
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => "(none)".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxpack_core::entry::OperationType;

    fn op(path: &str, kind: OperationType) -> SessionEntry {
        SessionEntry::file_operation(path, kind, None)
    }

    #[test]
    fn empty_span_renders_nothing() {
        let stats = FileStats::from_entries(&[SessionEntry::user("hi")]);
        assert!(stats.is_empty());
        assert_eq!(stats.render(), "");
    }

    #[test]
    fn ranks_most_modified_paths() {
        let entries = vec![
            op("src/lib.rs", OperationType::Edit),
            op("src/lib.rs", OperationType::Edit),
            op("src/main.rs", OperationType::Write),
            op("README.md", OperationType::Read),
            op("src/lib.rs", OperationType::Read),
        ];
        let stats = FileStats::from_entries(&entries);
        assert_eq!(stats.total_operations, 5);
        assert_eq!(stats.unique_paths, 3);
        assert_eq!(
            stats.most_modified,
            vec![("src/lib.rs".to_string(), 2), ("src/main.rs".to_string(), 1)]
        );
        assert_eq!(stats.extensions.get("rs"), Some(&4));
        assert_eq!(stats.extensions.get("md"), Some(&1));
    }

    #[test]
    fn ties_break_by_path() {
        let entries = vec![
            op("b.rs", OperationType::Write),
            op("a.rs", OperationType::Write),
        ];
        let stats = FileStats::from_entries(&entries);
        assert_eq!(stats.most_modified[0].0, "a.rs");
    }

    #[test]
    fn extension_edge_cases() {
        assert_eq!(extension_of("Makefile"), "(none)");
        assert_eq!(extension_of(".gitignore"), "(none)");
        assert_eq!(extension_of("dir.d/file"), "(none)");
        assert_eq!(extension_of("src/App.TSX"), "tsx");
    }

    #[test]
    fn render_lists_sections() {
        let stats = FileStats::from_entries(&[op("src/lib.rs", OperationType::Edit)]);
        let text = stats.render();
        assert!(text.contains("Most modified: src/lib.rs (1)"));
        assert!(text.contains("Extensions: rs=1"));
    }
}
