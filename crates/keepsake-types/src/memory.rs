//! Memory types for Keepsake.
//!
//! A character's long-term memory is a sequence of blocks, each scoped to
//! the conversation it was extracted from. A block groups one or more
//! bullets (atomic facts). The per-entry storage variant attaches optional
//! structured detail to each entry instead of relying on blocks alone.

use serde::{Deserialize, Serialize};

/// Source identifier for blocks whose originating chat is unknown.
pub const SOURCE_UNKNOWN: &str = "unknown";

/// Source identifier assigned to blocks produced by consolidation.
pub const SOURCE_CONSOLIDATED: &str = "consolidated";

/// A group of memory bullets sharing one conversation source and timestamp.
///
/// Invariant: a block with zero bullets is never persisted. Editing a block
/// down to zero bullets removes the block from the store entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBlock {
    /// The chat this block was extracted from ("unknown", a chat
    /// identifier, or "consolidated").
    pub source_id: String,
    /// Extraction timestamp, `YYYY-MM-DD HH:MM` (may be empty for
    /// migrated legacy content).
    pub date: String,
    /// Ordered, non-empty list of fact strings.
    pub bullets: Vec<String>,
}

impl MemoryBlock {
    /// Create a block. Callers are responsible for not persisting blocks
    /// with empty bullet lists.
    pub fn new(source_id: impl Into<String>, date: impl Into<String>, bullets: Vec<String>) -> Self {
        Self {
            source_id: source_id.into(),
            date: date.into(),
            bullets,
        }
    }
}

/// Structured detail carried by the one-file-per-entry storage variant.
///
/// All fields are optional; the block variant ignores them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDetails {
    /// Short event classification (e.g. "revelation", "conflict").
    pub event_type: Option<String>,
    /// 1 (minor) to 5 (critical). Clamped on construction.
    pub importance: Option<u8>,
    /// Characters involved in the remembered event.
    pub participants: Vec<String>,
    /// Free-text note on how the event affects the character.
    pub impact: Option<String>,
}

impl EntryDetails {
    /// True when no field carries information.
    pub fn is_empty(&self) -> bool {
        self.event_type.is_none()
            && self.importance.is_none()
            && self.participants.is_empty()
            && self.impact.is_none()
    }

    /// Set importance, clamped to the valid 1..=5 range.
    pub fn with_importance(mut self, importance: i64) -> Self {
        self.importance = Some(importance.clamp(1, 5) as u8);
        self
    }
}

/// The abstract unit both storage strategies exchange: a durable fact
/// group about the character, scoped to a conversation.
///
/// The batched-block strategy maps an entry 1:1 onto a [`MemoryBlock`]
/// (dropping `details`); the per-entry strategy writes each entry to its
/// own file and round-trips `details`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub source_id: String,
    pub date: String,
    pub bullets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<EntryDetails>,
}

impl MemoryEntry {
    /// Create an entry without structured detail.
    pub fn new(source_id: impl Into<String>, date: impl Into<String>, bullets: Vec<String>) -> Self {
        Self {
            source_id: source_id.into(),
            date: date.into(),
            bullets,
            details: None,
        }
    }
}

impl From<MemoryBlock> for MemoryEntry {
    fn from(block: MemoryBlock) -> Self {
        Self {
            source_id: block.source_id,
            date: block.date,
            bullets: block.bullets,
            details: None,
        }
    }
}

impl From<MemoryEntry> for MemoryBlock {
    fn from(entry: MemoryEntry) -> Self {
        Self {
            source_id: entry.source_id,
            date: entry.date,
            bullets: entry.bullets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_entry_roundtrip() {
        let block = MemoryBlock::new("chat7", "2026-08-06 12:00", vec!["fact".into()]);
        let entry: MemoryEntry = block.clone().into();
        assert_eq!(entry.source_id, "chat7");
        assert!(entry.details.is_none());
        let back: MemoryBlock = entry.into();
        assert_eq!(back, block);
    }

    #[test]
    fn test_importance_clamped() {
        assert_eq!(EntryDetails::default().with_importance(10).importance, Some(5));
        assert_eq!(EntryDetails::default().with_importance(-3).importance, Some(1));
        assert_eq!(EntryDetails::default().with_importance(3).importance, Some(3));
    }

    #[test]
    fn test_details_is_empty() {
        assert!(EntryDetails::default().is_empty());
        let details = EntryDetails {
            event_type: Some("revelation".into()),
            ..Default::default()
        };
        assert!(!details.is_empty());
    }

    #[test]
    fn test_entry_serde_skips_missing_details() {
        let entry = MemoryEntry::new("chat1", "", vec!["a".into()]);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("details"));
        let parsed: MemoryEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entry);
    }
}
