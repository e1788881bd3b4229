//! MemoryStorage trait definition.
//!
//! Two storage schemas exist for memories: batched tagged blocks in one
//! document per character, and one file per extracted entry. Both share
//! the same `MemoryEntry` read/write contract so the orchestrator never
//! hard-codes a schema. Strategy-specific operations (consolidation,
//! per-bullet editing) report [`StoreError::Unsupported`] where the
//! schema has no equivalent.

use keepsake_types::error::StoreError;
use keepsake_types::memory::MemoryEntry;

/// Pluggable persistence strategy for memory entries.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait MemoryStorage: Send + Sync {
    /// Load all persisted entries in store order.
    fn load(&self) -> impl std::future::Future<Output = Result<Vec<MemoryEntry>, StoreError>> + Send;

    /// Append entries to the store (read-modify-write for the block
    /// schema, one new file each for the per-entry schema).
    fn append(
        &self,
        entries: &[MemoryEntry],
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Replace the whole store with `entries` (merge/consolidation).
    /// Unsupported by the per-entry schema.
    fn replace_all(
        &self,
        entries: &[MemoryEntry],
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Delete everything.
    fn clear(&self) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Serialized form of the current store, for consolidation undo.
    /// Unsupported by the per-entry schema (which has no consolidation).
    fn snapshot(&self) -> impl std::future::Future<Output = Result<String, StoreError>> + Send;

    /// Restore a snapshot verbatim. Unsupported by the per-entry schema.
    fn restore(
        &self,
        snapshot: &str,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Delete the entry at `index` (block, or file in the per-entry schema).
    fn delete_entry(
        &self,
        index: usize,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Delete one bullet; the containing entry is pruned when its last
    /// bullet goes. Unsupported by the per-entry schema.
    fn delete_bullet(
        &self,
        entry_index: usize,
        bullet_index: usize,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Replace one bullet's text. Unsupported by the per-entry schema.
    fn edit_bullet(
        &self,
        entry_index: usize,
        bullet_index: usize,
        text: &str,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Interpret one raw model response entry for this schema.
    ///
    /// The block schema reads `- ` bullets (whole text as a single bullet
    /// when none); the per-entry schema additionally parses structured
    /// header lines into entry details. `None` when nothing usable remains.
    fn entry_from_response(&self, source_id: &str, date: &str, raw: &str) -> Option<MemoryEntry>;

    /// True when responses must contain `<memory>` tags (a tag-less
    /// response is a warning and zero memories, not a fallback).
    fn requires_tagged_response(&self) -> bool;

    /// True when the schema supports merge and consolidation.
    fn supports_consolidation(&self) -> bool;
}
