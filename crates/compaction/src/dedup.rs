//! File-operation deduplication.
//!
//! Agents re-read and re-write the same files many times in one session.
//! Before a prefix is summarized, redundant file history is dropped so the
//! summary reflects net file state rather than noisy repetition.
//!
//! Scanning left to right and tracking the last kept operation per path:
//!
//! | Previous | Current | Result |
//! |----------|---------|--------|
//! | read     | read    | current dropped |
//! | write    | read    | current dropped |
//! | write    | write   | earlier write removed, current kept in place |
//! | any      | edit    | kept |
//!
//! Everything else is kept. Non-file entries pass through untouched and in
//! their original positions.

use ctxpack_core::entry::{FileOperation, OperationType, SessionEntry};
use std::collections::HashMap;

/// Remove redundant file operations from an ordered entry sequence.
///
/// The output preserves order and is never longer than the input.
pub fn dedupe_file_operations(entries: &[SessionEntry]) -> Vec<SessionEntry> {
    let mut slots: Vec<Option<&SessionEntry>> = Vec::with_capacity(entries.len());
    // path → (operation type, slot index) of the last kept operation
    let mut last_by_path: HashMap<&str, (OperationType, usize)> = HashMap::new();

    for entry in entries {
        let Some(op) = entry.as_file_operation() else {
            slots.push(Some(entry));
            continue;
        };

        let previous = last_by_path.get(op.path.as_str()).copied();
        match (previous, op.operation_type) {
            (Some((OperationType::Read, _)), OperationType::Read)
            | (Some((OperationType::Write, _)), OperationType::Read) => {
                continue;
            }
            (Some((OperationType::Write, earlier)), OperationType::Write) => {
                slots[earlier] = None;
            }
            _ => {}
        }

        last_by_path.insert(op.path.as_str(), (op.operation_type, slots.len()));
        slots.push(Some(entry));
    }

    slots.into_iter().flatten().cloned().collect()
}

/// The file operations in a sequence, in order.
pub fn file_operations(entries: &[SessionEntry]) -> Vec<FileOperation> {
    entries
        .iter()
        .filter_map(SessionEntry::as_file_operation)
        .cloned()
        .collect()
}
