//! One-file-per-entry storage strategy.
//!
//! Each extracted entry becomes its own attachment named
//! `{character}-{millisecond timestamp}.md` with a structured body: header
//! lines (Source, Date, and optional Event/Importance/Participants/Impact
//! detail), a blank line, then the bullets. There is no merge or
//! consolidation in this schema; deletion is per-file.

use std::sync::Mutex;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use tracing::warn;

use keepsake_types::error::StoreError;
use keepsake_types::memory::{EntryDetails, MemoryEntry, SOURCE_UNKNOWN};

use crate::memory::block::bullet_lines;
use crate::memory::storage::MemoryStorage;
use crate::storage::attachment::AttachmentStore;

static HEADER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]+):\s*(.*)$").expect("header line regex"));

/// Render an entry to its file body.
fn render_entry(entry: &MemoryEntry) -> String {
    let mut lines = vec![
        format!("Source: {}", entry.source_id),
        format!("Date: {}", entry.date),
    ];
    if let Some(details) = &entry.details {
        if let Some(event) = &details.event_type {
            lines.push(format!("Event: {event}"));
        }
        if let Some(importance) = details.importance {
            lines.push(format!("Importance: {importance}"));
        }
        if !details.participants.is_empty() {
            lines.push(format!("Participants: {}", details.participants.join(", ")));
        }
        if let Some(impact) = &details.impact {
            lines.push(format!("Impact: {impact}"));
        }
    }
    lines.push(String::new());
    for bullet in &entry.bullets {
        lines.push(format!("- {bullet}"));
    }
    lines.join("\n")
}

/// Parse header lines and bullets out of an entry body.
///
/// Unrecognized headers are ignored; missing headers default (source
/// "unknown", empty date). Returns `None` when no bullets remain and the
/// body is empty.
fn parse_entry_body(body: &str) -> Option<MemoryEntry> {
    let mut source_id = SOURCE_UNKNOWN.to_string();
    let mut date = String::new();
    let mut details = EntryDetails::default();
    let mut rest_start = 0usize;

    for (offset, line) in body.split_inclusive('\n').scan(0usize, |pos, line| {
        let start = *pos;
        *pos += line.len();
        Some((start, line))
    }) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            rest_start = offset + line.len();
            break;
        }
        let Some(caps) = HEADER_LINE.captures(trimmed) else {
            rest_start = offset;
            break;
        };
        let value = caps[2].trim().to_string();
        match caps[1].to_ascii_lowercase().as_str() {
            "source" | "chat" => source_id = value,
            "date" => date = value,
            "event" => details.event_type = Some(value),
            "importance" => {
                if let Ok(importance) = value.parse::<i64>() {
                    details = details.with_importance(importance);
                }
            }
            "participants" => {
                details.participants = value
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "impact" => details.impact = Some(value),
            _ => {}
        }
        rest_start = offset + line.len();
    }

    let rest = body[rest_start..].trim();
    let mut bullets = bullet_lines(rest);
    if bullets.is_empty() && !rest.is_empty() {
        bullets.push(rest.to_string());
    }
    if bullets.is_empty() {
        return None;
    }

    Some(MemoryEntry {
        source_id,
        date,
        bullets,
        details: (!details.is_empty()).then_some(details),
    })
}

/// One attachment per entry in an [`AttachmentStore`].
pub struct EntryFileStorage<A: AttachmentStore> {
    store: A,
    prefix: String,
    /// Last issued file timestamp, bumped to stay strictly monotonic when
    /// two entries land in the same millisecond.
    last_stamp: Mutex<i64>,
}

impl<A: AttachmentStore> EntryFileStorage<A> {
    pub fn new(store: A, character: &str) -> Self {
        let safe: String = character
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        Self {
            store,
            prefix: format!("{safe}-"),
            last_stamp: Mutex::new(0),
        }
    }

    fn next_file_name(&self) -> String {
        let mut last = self.last_stamp.lock().expect("stamp lock poisoned");
        let now = Utc::now().timestamp_millis();
        *last = now.max(*last + 1);
        format!("{}{}.md", self.prefix, *last)
    }

    async fn entry_files(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|name| name.starts_with(&self.prefix) && name.ends_with(".md"))
            .collect())
    }
}

impl<A: AttachmentStore> MemoryStorage for EntryFileStorage<A> {
    async fn load(&self) -> Result<Vec<MemoryEntry>, StoreError> {
        let mut entries = Vec::new();
        for name in self.entry_files().await? {
            let Some(body) = self.store.read(&name).await? else {
                continue;
            };
            match parse_entry_body(&body) {
                Some(entry) => entries.push(entry),
                None => warn!(file = %name, "skipping memory file with no content"),
            }
        }
        Ok(entries)
    }

    async fn append(&self, entries: &[MemoryEntry]) -> Result<(), StoreError> {
        for entry in entries {
            let name = self.next_file_name();
            self.store.write(&name, &render_entry(entry)).await?;
        }
        Ok(())
    }

    async fn replace_all(&self, _entries: &[MemoryEntry]) -> Result<(), StoreError> {
        Err(StoreError::Unsupported("replace_all (per-entry schema)"))
    }

    async fn clear(&self) -> Result<(), StoreError> {
        for name in self.entry_files().await? {
            self.store.delete(&name).await?;
        }
        Ok(())
    }

    async fn snapshot(&self) -> Result<String, StoreError> {
        Err(StoreError::Unsupported("snapshot (per-entry schema)"))
    }

    async fn restore(&self, _snapshot: &str) -> Result<(), StoreError> {
        Err(StoreError::Unsupported("restore (per-entry schema)"))
    }

    async fn delete_entry(&self, index: usize) -> Result<(), StoreError> {
        let files = self.entry_files().await?;
        let name = files.get(index).ok_or(StoreError::IndexOutOfRange)?;
        self.store.delete(name).await
    }

    async fn delete_bullet(&self, _entry: usize, _bullet: usize) -> Result<(), StoreError> {
        Err(StoreError::Unsupported("delete_bullet (per-entry schema)"))
    }

    async fn edit_bullet(&self, _entry: usize, _bullet: usize, _text: &str) -> Result<(), StoreError> {
        Err(StoreError::Unsupported("edit_bullet (per-entry schema)"))
    }

    fn entry_from_response(&self, source_id: &str, date: &str, raw: &str) -> Option<MemoryEntry> {
        let parsed = parse_entry_body(raw)?;
        // The response decides detail fields; source and date come from
        // the pipeline, not from whatever the model echoed back.
        Some(MemoryEntry {
            source_id: source_id.to_string(),
            date: date.to_string(),
            bullets: parsed.bullets,
            details: parsed.details,
        })
    }

    fn requires_tagged_response(&self) -> bool {
        true
    }

    fn supports_consolidation(&self) -> bool {
        false
    }
}
