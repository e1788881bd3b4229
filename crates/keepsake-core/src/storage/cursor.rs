//! CursorStore trait definition and in-memory implementation.
//!
//! Extraction cursors live in chat-scoped metadata owned by the host; the
//! batch-cursor map (for background-fetched chats) lives in global
//! settings. Both are reached through this port. The orchestrator persists
//! the live cursor after every chunk so interrupted runs resume correctly.

use std::collections::BTreeMap;
use std::sync::Mutex;

use keepsake_types::chat::ExtractionCursor;
use keepsake_types::error::StoreError;

/// Per-chat extraction progress persistence.
pub trait CursorStore: Send + Sync {
    /// Load the cursor for a chat. `Ok(None)` when never created.
    fn load(
        &self,
        chat_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<ExtractionCursor>, StoreError>> + Send;

    /// Persist the cursor for a chat (upsert).
    fn save(
        &self,
        chat_id: &str,
        cursor: &ExtractionCursor,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Remove the cursor for a chat. No-op if absent.
    fn clear(&self, chat_id: &str) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Load the batch-cursor map: chat identifier -> last extracted index.
    fn load_batch(
        &self,
    ) -> impl std::future::Future<Output = Result<BTreeMap<String, i64>, StoreError>> + Send;

    /// Persist the batch-cursor map wholesale.
    fn save_batch(
        &self,
        cursors: &BTreeMap<String, i64>,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}

/// In-memory cursor store for tests and embedded hosts.
#[derive(Default)]
pub struct InMemoryCursorStore {
    cursors: Mutex<BTreeMap<String, ExtractionCursor>>,
    batch: Mutex<BTreeMap<String, i64>>,
}

impl InMemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CursorStore for InMemoryCursorStore {
    async fn load(&self, chat_id: &str) -> Result<Option<ExtractionCursor>, StoreError> {
        let cursors = self.cursors.lock().expect("cursor store lock poisoned");
        Ok(cursors.get(chat_id).copied())
    }

    async fn save(&self, chat_id: &str, cursor: &ExtractionCursor) -> Result<(), StoreError> {
        let mut cursors = self.cursors.lock().expect("cursor store lock poisoned");
        cursors.insert(chat_id.to_string(), *cursor);
        Ok(())
    }

    async fn clear(&self, chat_id: &str) -> Result<(), StoreError> {
        let mut cursors = self.cursors.lock().expect("cursor store lock poisoned");
        cursors.remove(chat_id);
        Ok(())
    }

    async fn load_batch(&self) -> Result<BTreeMap<String, i64>, StoreError> {
        let batch = self.batch.lock().expect("cursor store lock poisoned");
        Ok(batch.clone())
    }

    async fn save_batch(&self, cursors: &BTreeMap<String, i64>) -> Result<(), StoreError> {
        let mut batch = self.batch.lock().expect("cursor store lock poisoned");
        *batch = cursors.clone();
        Ok(())
    }
}
