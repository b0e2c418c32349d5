//! Token estimation utilities.
//!
//! Counts are budget estimates, not billing-accurate tokenizer output. The
//! heuristic weighs character classes separately because CJK text and code
//! tokenize very differently from English prose:
//!
//! | Class | Weight |
//! |-------|--------|
//! | CJK ideograph / kana / hangul | 1.0 per char |
//! | Latin word (maximal letter run) | 1.3 per word |
//! | Digit run | 1.0 per run |
//! | Other non-whitespace symbol | 0.5 per char |
//!
//! The weighted sum is floored and one token of per-text overhead is added.
//! Estimation is pure arithmetic and deterministic.

use ctxpack_core::entry::{EntryPayload, SessionEntry};

/// Framing cost per entry (role name, delimiters, field markers).
pub const ENTRY_OVERHEAD_TOKENS: usize = 4;

const CJK_WEIGHT: f64 = 1.0;
const WORD_WEIGHT: f64 = 1.3;
const DIGIT_RUN_WEIGHT: f64 = 1.0;
const SYMBOL_WEIGHT: f64 = 0.5;

#[derive(Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Cjk,
    Letter,
    Digit,
    Symbol,
    Space,
}

fn classify_char(c: char) -> CharClass {
    if is_cjk(c) {
        CharClass::Cjk
    } else if c.is_alphabetic() {
        CharClass::Letter
    } else if c.is_numeric() {
        CharClass::Digit
    } else if c.is_whitespace() {
        CharClass::Space
    } else {
        CharClass::Symbol
    }
}

fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x3040..=0x30FF      // Hiragana, Katakana
        | 0x3400..=0x4DBF    // CJK Extension A
        | 0x4E00..=0x9FFF    // CJK Unified Ideographs
        | 0xAC00..=0xD7AF    // Hangul syllables
        | 0xF900..=0xFAFF    // CJK Compatibility Ideographs
        | 0x20000..=0x2FA1F  // CJK Extensions B..F, compatibility supplement
    )
}

/// Estimate the token count for a string.
///
/// Empty text costs nothing; any other text costs at least one token.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }

    let mut cjk = 0usize;
    let mut words = 0usize;
    let mut digit_runs = 0usize;
    let mut symbols = 0usize;
    let mut previous = CharClass::Space;

    for c in text.chars() {
        let class = classify_char(c);
        match class {
            CharClass::Cjk => cjk += 1,
            CharClass::Letter if previous != CharClass::Letter => words += 1,
            CharClass::Digit if previous != CharClass::Digit => digit_runs += 1,
            CharClass::Symbol => symbols += 1,
            _ => {}
        }
        previous = class;
    }

    let weighted = cjk as f64 * CJK_WEIGHT
        + words as f64 * WORD_WEIGHT
        + digit_runs as f64 * DIGIT_RUN_WEIGHT
        + symbols as f64 * SYMBOL_WEIGHT;

    weighted.floor() as usize + 1
}

/// Estimate the payload cost of an entry, without framing overhead.
pub fn estimate_payload_tokens(entry: &SessionEntry) -> usize {
    match &entry.payload {
        EntryPayload::Message(msg) => {
            let content: usize = msg.content.segments().map(estimate_tokens).sum();
            let calls: usize = msg
                .tool_calls
                .iter()
                .map(|call| estimate_tokens(&call.name) + estimate_tokens(&call.arguments))
                .sum();
            content + calls
        }
        EntryPayload::FileOperation(file) => {
            let op = &file.operation;
            estimate_tokens(&op.path)
                + estimate_tokens(op.operation_type.label())
                + op.content_hash.as_deref().map_or(0, estimate_tokens)
        }
        EntryPayload::CompactionRecord(record) => estimate_tokens(&record.summary),
        EntryPayload::ModelChange { model, provider } => {
            estimate_tokens(model) + provider.as_deref().map_or(0, estimate_tokens)
        }
        EntryPayload::ThinkingLevelChange { level } => estimate_tokens(level),
        EntryPayload::Custom { custom_type, data } => {
            let data_tokens = match data {
                serde_json::Value::Null => 0,
                serde_json::Value::String(s) => estimate_tokens(s),
                other => estimate_tokens(&other.to_string()),
            };
            estimate_tokens(custom_type) + data_tokens
        }
    }
}

/// Estimate tokens for a single entry including per-entry overhead.
pub fn estimate_entry(entry: &SessionEntry) -> usize {
    ENTRY_OVERHEAD_TOKENS + estimate_payload_tokens(entry)
}

/// Estimate tokens for a slice of entries.
pub fn estimate_entries(entries: &[SessionEntry]) -> usize {
    entries.iter().map(estimate_entry).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxpack_core::entry::{ContentPart, MessageContent, OperationType};

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn whitespace_only_is_overhead() {
        assert_eq!(estimate_tokens("   \n\t"), 1);
    }

    #[test]
    fn single_word() {
        // 1.3 → 1, +1 overhead
        assert_eq!(estimate_tokens("hello"), 2);
    }

    #[test]
    fn words_weigh_more_than_one() {
        // 10 words → 13.0, +1
        let text = "the quick brown fox jumps over the lazy dog again";
        assert_eq!(estimate_tokens(text), 14);
    }

    #[test]
    fn digit_runs_count_once() {
        assert_eq!(estimate_tokens("12345"), 2);
        assert_eq!(estimate_tokens("1 2 3"), 4);
    }

    #[test]
    fn symbols_are_half_tokens() {
        // 4 symbols → 2.0, +1
        assert_eq!(estimate_tokens("{}()"), 3);
    }

    #[test]
    fn cjk_is_one_per_char() {
        // 4 ideographs → 4.0, +1
        assert_eq!(estimate_tokens("上下文窗"), 5);
    }

    #[test]
    fn mixed_classes_sum() {
        // "fn" word 1.3, "main" word 1.3, "()" 1.0, "{}" 1.0, "42" 1.0 = 5.6 → 5, +1
        assert_eq!(estimate_tokens("fn main() {} 42"), 6);
    }

    #[test]
    fn deterministic() {
        let text = "let x = vec![1, 2, 3]; // 注释";
        assert_eq!(estimate_tokens(text), estimate_tokens(text));
    }

    #[test]
    fn monotone_for_repeated_pattern() {
        let unit = "word 12 {x} 字 ";
        let mut last = 0;
        for n in 0..50 {
            let tokens = estimate_tokens(&unit.repeat(n));
            assert!(tokens >= last, "estimate dropped at n={n}");
            last = tokens;
        }
    }

    #[test]
    fn entry_includes_overhead() {
        let entry = SessionEntry::user("hello"); // 2 + 4 overhead
        assert_eq!(estimate_entry(&entry), 6);
    }

    #[test]
    fn multipart_content_sums_parts() {
        let parts = MessageContent::Parts(vec![
            ContentPart::Thinking {
                thinking: "hello".into(),
            },
            ContentPart::Text {
                text: "hello".into(),
            },
        ]);
        let entry = SessionEntry::assistant(parts);
        assert_eq!(estimate_entry(&entry), ENTRY_OVERHEAD_TOKENS + 4);
    }

    #[test]
    fn file_operation_has_cost() {
        let entry = SessionEntry::file_operation("src/main.rs", OperationType::Edit, None);
        assert!(estimate_entry(&entry) > ENTRY_OVERHEAD_TOKENS);
    }

    #[test]
    fn multiple_entries() {
        let entries = vec![
            SessionEntry::user("hello"),      // 6
            SessionEntry::assistant("world"), // 6
        ];
        assert_eq!(estimate_entries(&entries), 12);
    }

    #[test]
    fn empty_slice_is_zero() {
        assert_eq!(estimate_entries(&[]), 0);
    }
}
