//! Batched-block storage strategy.
//!
//! All memories for one character (or one chat, in per-chat mode) live in
//! a single tagged document in the attachment store. Every mutation is a
//! read-modify-write of the whole document; legacy content is migrated to
//! the tagged format on first read and written back immediately.

use tracing::{info, warn};

use keepsake_types::error::StoreError;
use keepsake_types::memory::{MemoryBlock, MemoryEntry};

use crate::memory::block::{
    bullet_lines, current_timestamp, migrate_legacy, parse_blocks, serialize_blocks,
};
use crate::memory::storage::MemoryStorage;
use crate::storage::attachment::AttachmentStore;

/// Sanitize a character name for use in an attachment name.
fn safe_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Attachment name for a character's memory document.
///
/// `chat_id` is set in per-chat mode and suffixes the name so each chat
/// gets its own store.
pub fn memory_file_name(character: &str, chat_id: Option<&str>) -> String {
    let safe = safe_name(character);
    match chat_id {
        Some(chat) => format!("{safe}-chat{}-memories.md", safe_name(chat)),
        None => format!("{safe}-memories.md"),
    }
}

/// One tagged document per character in an [`AttachmentStore`].
pub struct BlockAttachmentStorage<A: AttachmentStore> {
    store: A,
    file_name: String,
}

impl<A: AttachmentStore> BlockAttachmentStorage<A> {
    pub fn new(store: A, file_name: String) -> Self {
        Self { store, file_name }
    }

    /// The attachment name this strategy reads and writes.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Read the document, migrating legacy formats in place.
    async fn read_migrated(&self) -> Result<String, StoreError> {
        let content = self.store.read(&self.file_name).await?.unwrap_or_default();
        match migrate_legacy(&content, &current_timestamp()) {
            Some(migrated) => {
                info!(file = %self.file_name, "migrating memories to tagged format");
                self.store.write(&self.file_name, &migrated).await?;
                Ok(migrated)
            }
            None => Ok(content),
        }
    }

    async fn read_blocks(&self) -> Result<Vec<MemoryBlock>, StoreError> {
        Ok(parse_blocks(&self.read_migrated().await?))
    }

    async fn write_blocks(&self, blocks: &[MemoryBlock]) -> Result<(), StoreError> {
        if blocks.is_empty() {
            self.store.delete(&self.file_name).await
        } else {
            self.store
                .write(&self.file_name, &serialize_blocks(blocks))
                .await
        }
    }
}

impl<A: AttachmentStore> MemoryStorage for BlockAttachmentStorage<A> {
    async fn load(&self) -> Result<Vec<MemoryEntry>, StoreError> {
        Ok(self
            .read_blocks()
            .await?
            .into_iter()
            .map(MemoryEntry::from)
            .collect())
    }

    async fn append(&self, entries: &[MemoryEntry]) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut blocks = self.read_blocks().await?;
        blocks.extend(entries.iter().cloned().map(MemoryBlock::from));
        self.write_blocks(&blocks).await
    }

    async fn replace_all(&self, entries: &[MemoryEntry]) -> Result<(), StoreError> {
        let blocks: Vec<MemoryBlock> = entries.iter().cloned().map(MemoryBlock::from).collect();
        self.write_blocks(&blocks).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.store.delete(&self.file_name).await
    }

    async fn snapshot(&self) -> Result<String, StoreError> {
        self.read_migrated().await
    }

    async fn restore(&self, snapshot: &str) -> Result<(), StoreError> {
        self.store.write(&self.file_name, snapshot).await
    }

    async fn delete_entry(&self, index: usize) -> Result<(), StoreError> {
        let mut blocks = self.read_blocks().await?;
        if index >= blocks.len() {
            return Err(StoreError::IndexOutOfRange);
        }
        blocks.remove(index);
        self.write_blocks(&blocks).await
    }

    async fn delete_bullet(&self, entry_index: usize, bullet_index: usize) -> Result<(), StoreError> {
        let mut blocks = self.read_blocks().await?;
        let block = blocks.get_mut(entry_index).ok_or(StoreError::IndexOutOfRange)?;
        if bullet_index >= block.bullets.len() {
            return Err(StoreError::IndexOutOfRange);
        }
        block.bullets.remove(bullet_index);
        // A block may never persist with zero bullets.
        if block.bullets.is_empty() {
            blocks.remove(entry_index);
        }
        self.write_blocks(&blocks).await
    }

    async fn edit_bullet(
        &self,
        entry_index: usize,
        bullet_index: usize,
        text: &str,
    ) -> Result<(), StoreError> {
        let text = text.trim();
        if text.is_empty() {
            return self.delete_bullet(entry_index, bullet_index).await;
        }
        let mut blocks = self.read_blocks().await?;
        let block = blocks.get_mut(entry_index).ok_or(StoreError::IndexOutOfRange)?;
        let bullet = block
            .bullets
            .get_mut(bullet_index)
            .ok_or(StoreError::IndexOutOfRange)?;
        *bullet = text.to_string();
        self.write_blocks(&blocks).await
    }

    fn entry_from_response(&self, source_id: &str, date: &str, raw: &str) -> Option<MemoryEntry> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let mut bullets = bullet_lines(raw);
        if bullets.is_empty() {
            // The model ignored the bullet instruction; keep the whole
            // entry as a single fact rather than losing it.
            warn!("response entry had no bullets, keeping as single fact");
            bullets.push(raw.to_string());
        }
        Some(MemoryEntry::new(source_id, date, bullets))
    }

    fn requires_tagged_response(&self) -> bool {
        false
    }

    fn supports_consolidation(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::attachment::InMemoryAttachmentStore;

    fn storage() -> BlockAttachmentStorage<InMemoryAttachmentStore> {
        BlockAttachmentStorage::new(
            InMemoryAttachmentStore::new(),
            memory_file_name("Luna", None),
        )
    }

    fn entry(src: &str, bullets: &[&str]) -> MemoryEntry {
        MemoryEntry::new(src, "2026-08-06 12:00", bullets.iter().map(|b| b.to_string()).collect())
    }

    #[test]
    fn test_memory_file_name() {
        assert_eq!(memory_file_name("Luna", None), "Luna-memories.md");
        assert_eq!(
            memory_file_name("Dr. Aya/3", Some("main-12")),
            "Dr__Aya_3-chatmain-12-memories.md"
        );
    }

    #[tokio::test]
    async fn test_append_and_load() {
        let storage = storage();
        storage.append(&[entry("chat1", &["a", "b"])]).await.unwrap();
        storage.append(&[entry("chat2", &["c"])]).await.unwrap();

        let entries = storage.load().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].bullets, vec!["a", "b"]);
        assert_eq!(entries[1].source_id, "chat2");
    }

    #[tokio::test]
    async fn test_delete_last_bullet_prunes_block() {
        let storage = storage();
        storage
            .append(&[entry("chat1", &["only"]), entry("chat2", &["kept"])])
            .await
            .unwrap();

        storage.delete_bullet(0, 0).await.unwrap();
        let entries = storage.load().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source_id, "chat2");
    }

    #[tokio::test]
    async fn test_edit_bullet() {
        let storage = storage();
        storage.append(&[entry("chat1", &["old text"])]).await.unwrap();
        storage.edit_bullet(0, 0, "new text").await.unwrap();
        let entries = storage.load().await.unwrap();
        assert_eq!(entries[0].bullets, vec!["new text"]);
    }

    #[tokio::test]
    async fn test_edit_bullet_to_empty_deletes() {
        let storage = storage();
        storage.append(&[entry("chat1", &["only"])]).await.unwrap();
        storage.edit_bullet(0, 0, "  ").await.unwrap();
        assert!(storage.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_restore_verbatim() {
        let storage = storage();
        storage.append(&[entry("chat1", &["a"])]).await.unwrap();
        let snapshot = storage.snapshot().await.unwrap();

        storage.replace_all(&[entry("consolidated", &["merged"])]).await.unwrap();
        assert_ne!(storage.snapshot().await.unwrap(), snapshot);

        storage.restore(&snapshot).await.unwrap();
        assert_eq!(storage.snapshot().await.unwrap(), snapshot);
    }

    #[tokio::test]
    async fn test_legacy_content_migrated_on_read() {
        let store = InMemoryAttachmentStore::new();
        store.seed("Luna-memories.md", "## Memory 1\n- old fact\n");
        let storage = BlockAttachmentStorage::new(store, "Luna-memories.md".to_string());

        let entries = storage.load().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].bullets, vec!["old fact"]);

        // Written back in tagged form: a second read needs no migration.
        let raw = storage.snapshot().await.unwrap();
        assert!(raw.contains("<memory"));
    }

    #[tokio::test]
    async fn test_replace_all_empty_deletes_document() {
        let storage = storage();
        storage.append(&[entry("chat1", &["a"])]).await.unwrap();
        storage.replace_all(&[]).await.unwrap();
        assert!(storage.load().await.unwrap().is_empty());
    }

    #[test]
    fn test_entry_from_response_fallback_single_bullet() {
        let storage = storage();
        let entry = storage
            .entry_from_response("chat1", "2026-08-06 12:00", "no bullet marker here")
            .unwrap();
        assert_eq!(entry.bullets, vec!["no bullet marker here"]);
    }
}
