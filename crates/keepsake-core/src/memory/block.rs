//! Tagged-block memory codec.
//!
//! The persisted form of a memory store is a sequence of
//! `<memory chat=".." date="..">` blocks, bullets one per line prefixed
//! with `- `, blocks separated by a blank line. Parsing is tolerant of
//! unknown or missing attributes; serialization is the exact inverse, so
//! `parse(serialize(blocks)) == blocks` for any well-formed block list.
//!
//! Two legacy formats are migrated one-way on first read: the numbered
//! `## Memory N` section format and fully flat untagged text.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;

use keepsake_types::memory::{MemoryBlock, SOURCE_UNKNOWN};

static MEMORY_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<memory\b([^>]*)>(.*?)</memory>").expect("memory tag regex")
});

static CHAT_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"chat="([^"]*)""#).expect("chat attr regex"));

static DATE_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"date="([^"]*)""#).expect("date attr regex"));

static LEGACY_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^## Memory \d+\s*$").expect("legacy section regex"));

static LEGACY_TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^_Extracted:\s*(.+?)_\s*\n").expect("legacy timestamp regex"));

/// Timestamp format stamped on new blocks.
pub fn current_timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M").to_string()
}

/// Extract bullet lines (`- ` prefix) from a block body.
pub fn bullet_lines(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix("- "))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse tagged memory blocks out of `content`.
///
/// Missing attributes default to source "unknown" and an empty date.
/// Blocks yielding zero bullets are dropped.
pub fn parse_blocks(content: &str) -> Vec<MemoryBlock> {
    if content.trim().is_empty() {
        return Vec::new();
    }

    let mut blocks = Vec::new();
    for caps in MEMORY_TAG.captures_iter(content) {
        let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let body = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

        let source_id = CHAT_ATTR
            .captures(attrs)
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| SOURCE_UNKNOWN.to_string());
        let date = DATE_ATTR
            .captures(attrs)
            .map(|c| c[1].to_string())
            .unwrap_or_default();

        let bullets = bullet_lines(body);
        if !bullets.is_empty() {
            blocks.push(MemoryBlock {
                source_id,
                date,
                bullets,
            });
        }
    }

    blocks
}

/// Serialize blocks back to tagged text, one tag per block, blocks joined
/// by a blank line.
pub fn serialize_blocks(blocks: &[MemoryBlock]) -> String {
    blocks
        .iter()
        .map(|block| {
            let bullets = block
                .bullets
                .iter()
                .map(|bullet| format!("- {bullet}"))
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "<memory chat=\"{}\" date=\"{}\">\n{}\n</memory>",
                block.source_id, block.date, bullets
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Total bullets across all blocks.
pub fn count_bullets(blocks: &[MemoryBlock]) -> usize {
    blocks.iter().map(|b| b.bullets.len()).sum()
}

/// Coalesce same-source blocks into one, preserving first-seen order.
///
/// Bullets are concatenated in encounter order; the first block's date is
/// kept for each source.
pub fn merge_blocks(blocks: Vec<MemoryBlock>) -> Vec<MemoryBlock> {
    let mut merged: Vec<MemoryBlock> = Vec::new();
    for block in blocks {
        match merged.iter_mut().find(|m| m.source_id == block.source_id) {
            Some(existing) => existing.bullets.extend(block.bullets),
            None => merged.push(block),
        }
    }
    merged
}

/// Migrate legacy content to the tagged format.
///
/// Returns `Some(migrated)` when the content was in a pre-tag format and
/// had to be converted; `None` when it is already tagged (or empty). The
/// caller writes the migrated form back immediately so future reads skip
/// detection.
pub fn migrate_legacy(content: &str, timestamp: &str) -> Option<String> {
    if content.trim().is_empty() {
        return None;
    }
    if content.contains("<memory") {
        return None;
    }

    // Numbered-section format: split on "## Memory N" headers.
    if LEGACY_SECTION.is_match(content) {
        let mut blocks = Vec::new();
        for part in LEGACY_SECTION.split(content).skip(1) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let (date, text) = match LEGACY_TIMESTAMP.captures(part) {
                Some(caps) => {
                    let whole = caps.get(0).expect("capture 0 always present");
                    (caps[1].trim().to_string(), part[whole.end()..].trim())
                }
                None => (timestamp.to_string(), part),
            };

            let mut bullets = bullet_lines(text);
            if bullets.is_empty() && !text.is_empty() {
                bullets.push(text.to_string());
            }
            if !bullets.is_empty() {
                blocks.push(MemoryBlock::new(SOURCE_UNKNOWN, date, bullets));
            }
        }
        return Some(serialize_blocks(&blocks));
    }

    // Fully flat text: wrap as a single block.
    let mut bullets = bullet_lines(content);
    if bullets.is_empty() {
        bullets.push(content.trim().to_string());
    }
    Some(serialize_blocks(&[MemoryBlock::new(
        SOURCE_UNKNOWN,
        timestamp,
        bullets,
    )]))
}

/// Split a cleaned model response into raw entry bodies.
///
/// Each `<memory>` block yields one entry. With no tags at all the whole
/// response is treated as a single entry, unless `require_tags` is set (the
/// per-entry storage variant), in which case an empty list is returned and
/// the caller logs a warning.
pub fn parse_response_entries(response: &str, require_tags: bool) -> Vec<String> {
    let entries: Vec<String> = MEMORY_TAG
        .captures_iter(response)
        .filter_map(|caps| {
            let body = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
            (!body.is_empty()).then(|| body.to_string())
        })
        .collect();

    if !entries.is_empty() {
        return entries;
    }
    if require_tags {
        return Vec::new();
    }

    let whole = response.trim();
    if whole.is_empty() {
        Vec::new()
    } else {
        vec![whole.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(src: &str, date: &str, bullets: &[&str]) -> MemoryBlock {
        MemoryBlock::new(src, date, bullets.iter().map(|b| b.to_string()).collect())
    }

    #[test]
    fn test_parse_serialize_roundtrip() {
        let blocks = vec![
            block("chat7", "2026-08-06 12:00", &["fact one", "fact two"]),
            block("unknown", "", &["a lone fact"]),
        ];
        let text = serialize_blocks(&blocks);
        assert_eq!(parse_blocks(&text), blocks);
    }

    #[test]
    fn test_parse_defaults_missing_attributes() {
        let text = "<memory>\n- something happened\n</memory>";
        let blocks = parse_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].source_id, "unknown");
        assert_eq!(blocks[0].date, "");
    }

    #[test]
    fn test_parse_ignores_unknown_attributes() {
        let text = "<memory chat=\"c1\" mood=\"wistful\" date=\"2026-01-01 08:00\">\n- fact\n</memory>";
        let blocks = parse_blocks(text);
        assert_eq!(blocks[0].source_id, "c1");
        assert_eq!(blocks[0].date, "2026-01-01 08:00");
    }

    #[test]
    fn test_parse_drops_zero_bullet_blocks() {
        let text = "<memory chat=\"c1\" date=\"\">\nno bullets here\n</memory>\n\n<memory>\n- kept\n</memory>";
        let blocks = parse_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].bullets, vec!["kept"]);
    }

    #[test]
    fn test_count_bullets() {
        let blocks = vec![block("a", "", &["x", "y"]), block("b", "", &["z"])];
        assert_eq!(count_bullets(&blocks), 3);
    }

    #[test]
    fn test_merge_groups_by_source_preserving_order() {
        let blocks = vec![
            block("A", "d1", &["x"]),
            block("B", "d2", &["y"]),
            block("A", "d3", &["z"]),
        ];
        let merged = merge_blocks(blocks);
        assert_eq!(
            merged,
            vec![block("A", "d1", &["x", "z"]), block("B", "d2", &["y"])]
        );
    }

    #[test]
    fn test_migrate_skips_tagged_content() {
        let text = "<memory chat=\"c\" date=\"\">\n- fact\n</memory>";
        assert!(migrate_legacy(text, "2026-08-06 12:00").is_none());
    }

    #[test]
    fn test_migrate_numbered_sections() {
        let legacy = "## Memory 1\n_Extracted: 2025-11-02 09:30_\n- met the blacksmith\n- bought a dagger\n\n## Memory 2\nShe fears deep water.\n";
        let migrated = migrate_legacy(legacy, "2026-08-06 12:00").unwrap();
        let blocks = parse_blocks(&migrated);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].date, "2025-11-02 09:30");
        assert_eq!(blocks[0].bullets, vec!["met the blacksmith", "bought a dagger"]);
        // Plain text becomes a single bullet with the migration timestamp.
        assert_eq!(blocks[1].date, "2026-08-06 12:00");
        assert_eq!(blocks[1].bullets, vec!["She fears deep water."]);
    }

    #[test]
    fn test_migrate_flat_text() {
        let migrated = migrate_legacy("she owns a grey cat", "2026-08-06 12:00").unwrap();
        let blocks = parse_blocks(&migrated);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].source_id, "unknown");
        assert_eq!(blocks[0].date, "2026-08-06 12:00");
        assert_eq!(blocks[0].bullets, vec!["she owns a grey cat"]);
    }

    #[test]
    fn test_migrate_flat_bulleted_text() {
        let migrated = migrate_legacy("- one\n- two", "2026-08-06 12:00").unwrap();
        let blocks = parse_blocks(&migrated);
        assert_eq!(blocks[0].bullets, vec!["one", "two"]);
    }

    #[test]
    fn test_response_entries_tagged() {
        let response = "<memory>\n- fact one\n- fact two\n</memory>\n<memory>\n- other\n</memory>";
        let entries = parse_response_entries(response, false);
        assert_eq!(entries.len(), 2);
        assert!(entries[0].contains("fact one"));
    }

    #[test]
    fn test_response_entries_fallback_untagged() {
        let entries = parse_response_entries("- loose bullet", false);
        assert_eq!(entries, vec!["- loose bullet"]);
    }

    #[test]
    fn test_response_entries_require_tags() {
        assert!(parse_response_entries("- loose bullet", true).is_empty());
    }

    #[test]
    fn test_response_entries_empty() {
        assert!(parse_response_entries("   ", false).is_empty());
    }
}
