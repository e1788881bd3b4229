//! Message window selection and filtering.
//!
//! The selector turns "everything after the cursor" into bounded chunks
//! and formats each chunk for the extraction prompt. Chunk boundaries are
//! based on original message indices, never on how many lines survive
//! filtering: a chunk whose every message filters away still reports its
//! last original index so the cursor can advance past it.

use std::sync::LazyLock;

use regex::Regex;

use keepsake_types::chat::ChatTurn;

static CODE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("code block regex"));

static DETAILS_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<details\b[^>]*>.*?</details>").expect("details regex"));

static TABLE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\|.*\|\s*$\n?").expect("table line regex"));

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("html tag regex"));

static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("newline collapse regex"));

/// Strip markup that never carries memories: fenced code blocks,
/// collapsed detail sections, markdown tables, and HTML tags. Runs of 3+
/// newlines collapse to 2.
pub fn clean_message_text(text: &str) -> String {
    let text = CODE_BLOCK.replace_all(text, "");
    let text = DETAILS_SECTION.replace_all(&text, "");
    let text = TABLE_LINE.replace_all(&text, "");
    let text = HTML_TAG.replace_all(&text, "");
    let text = EXCESS_NEWLINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Strip HTML tags only (used when pinning a raw message as a memory,
/// where code blocks and tables should survive).
pub fn strip_html_tags(text: &str) -> String {
    HTML_TAG.replace_all(text, "").trim().to_string()
}

/// Format one turn as `"<speaker>: <text>"`.
///
/// Returns `None` for dropped turns: system/narrator messages with no
/// display name, and messages left empty after filtering.
fn format_turn(turn: &ChatTurn) -> Option<String> {
    if turn.is_system && turn.speaker.trim().is_empty() {
        return None;
    }
    let text = clean_message_text(&turn.text);
    if text.is_empty() {
        return None;
    }
    Some(format!("{}: {}", turn.speaker, text))
}

/// The unprocessed span `[start, end_exclusive)` after the cursor, bounded
/// by an optional inclusive `end_index`. `None` when there is no work.
pub fn unprocessed_span(
    last_extracted_index: i64,
    message_count: usize,
    end_index: Option<usize>,
) -> Option<(usize, usize)> {
    let start = (last_extracted_index + 1).max(0) as usize;
    let end_exclusive = match end_index {
        Some(end) => (end + 1).min(message_count),
        None => message_count,
    };
    (start < end_exclusive).then_some((start, end_exclusive))
}

/// Chunks needed to cover `span_len` messages at `chunk_size` per chunk.
pub fn chunk_count(span_len: usize, chunk_size: usize) -> usize {
    span_len.div_ceil(chunk_size.max(1))
}

/// One formatted chunk of unprocessed messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSlice {
    /// Formatted lines joined by blank lines. May be empty when every
    /// message in the chunk filtered away.
    pub text: String,
    /// Original index of the last message in this chunk.
    pub end_index: usize,
    /// How many messages survived filtering.
    pub formatted_count: usize,
}

/// Slice the next chunk after the cursor.
///
/// Returns `None` when no unprocessed messages remain. The slice covers at
/// most `chunk_size` original messages starting at `last_extracted_index +
/// 1`; `end_index` bounds the window inclusively (defaults to the last
/// message).
pub fn select_window(
    turns: &[ChatTurn],
    last_extracted_index: i64,
    chunk_size: usize,
    end_index: Option<usize>,
) -> Option<WindowSlice> {
    let (start, end_exclusive) = unprocessed_span(last_extracted_index, turns.len(), end_index)?;
    let chunk_end = (start + chunk_size.max(1)).min(end_exclusive);
    let slice = &turns[start..chunk_end];

    let lines: Vec<String> = slice.iter().filter_map(format_turn).collect();
    Some(WindowSlice {
        text: lines.join("\n\n"),
        end_index: chunk_end - 1,
        formatted_count: lines.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turns(count: usize) -> Vec<ChatTurn> {
        (0..count)
            .map(|i| {
                if i % 2 == 0 {
                    ChatTurn::user("Mark", format!("user message {i}"))
                } else {
                    ChatTurn::character("Luna", format!("reply {i}"))
                }
            })
            .collect()
    }

    #[test]
    fn test_no_work_when_cursor_at_end() {
        let turns = turns(5);
        assert!(select_window(&turns, 4, 10, None).is_none());
        assert!(unprocessed_span(4, 5, None).is_none());
    }

    #[test]
    fn test_chunk_boundaries_45_by_20() {
        // 45 unprocessed messages at chunk size 20: [0,20) [20,40) [40,45).
        assert_eq!(chunk_count(45, 20), 3);
        let turns = turns(45);

        let first = select_window(&turns, -1, 20, None).unwrap();
        assert_eq!(first.end_index, 19);

        let second = select_window(&turns, first.end_index as i64, 20, None).unwrap();
        assert_eq!(second.end_index, 39);

        let third = select_window(&turns, second.end_index as i64, 20, None).unwrap();
        assert_eq!(third.end_index, 44);

        assert!(select_window(&turns, 44, 20, None).is_none());
    }

    #[test]
    fn test_end_index_bounds_window_inclusively() {
        let turns = turns(30);
        let slice = select_window(&turns, -1, 50, Some(9)).unwrap();
        assert_eq!(slice.end_index, 9);
        assert_eq!(slice.formatted_count, 10);
        assert!(select_window(&turns, 9, 50, Some(9)).is_none());
    }

    #[test]
    fn test_end_index_past_chat_is_clamped() {
        let turns = turns(5);
        let slice = select_window(&turns, -1, 50, Some(99)).unwrap();
        assert_eq!(slice.end_index, 4);
    }

    #[test]
    fn test_unnamed_system_turns_dropped_named_kept() {
        let turns = vec![
            ChatTurn::system("", "scene transition"),
            ChatTurn::system("Narrator", "The storm broke at dusk."),
            ChatTurn::character("Luna", "We should go inside."),
        ];
        let slice = select_window(&turns, -1, 10, None).unwrap();
        assert_eq!(slice.formatted_count, 2);
        assert!(slice.text.contains("Narrator: The storm broke at dusk."));
        assert!(!slice.text.contains("scene transition"));
    }

    #[test]
    fn test_fully_filtered_chunk_still_reports_end_index() {
        let turns = vec![
            ChatTurn::system("", "dropped"),
            ChatTurn::character("Luna", "```rust\nfn code_only() {}\n```"),
        ];
        let slice = select_window(&turns, -1, 10, None).unwrap();
        assert_eq!(slice.formatted_count, 0);
        assert!(slice.text.is_empty());
        assert_eq!(slice.end_index, 1);
    }

    #[test]
    fn test_clean_strips_code_blocks_and_html() {
        let text = "before ```python\nprint('x')\n``` after <b>bold</b>";
        assert_eq!(clean_message_text(text), "before  after bold");
    }

    #[test]
    fn test_clean_strips_details_and_tables() {
        let text = "intro\n<details><summary>stats</summary>hidden</details>\n| a | b |\n| - | - |\noutro";
        let cleaned = clean_message_text(text);
        assert!(!cleaned.contains("hidden"));
        assert!(!cleaned.contains("| a |"));
        assert!(cleaned.contains("intro"));
        assert!(cleaned.contains("outro"));
    }

    #[test]
    fn test_clean_collapses_newline_runs() {
        assert_eq!(clean_message_text("a\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_format_joins_with_blank_lines() {
        let turns = vec![
            ChatTurn::user("Mark", "hello"),
            ChatTurn::character("Luna", "hi"),
        ];
        let slice = select_window(&turns, -1, 10, None).unwrap();
        assert_eq!(slice.text, "Mark: hello\n\nLuna: hi");
    }
}
