//! AttachmentStore trait definition and in-memory implementation.
//!
//! Memory documents are plain-text attachments scoped to one character.
//! The store is name-addressed: list, read, write, delete.

use std::collections::BTreeMap;
use std::sync::Mutex;

use keepsake_types::error::StoreError;

/// Character-scoped text attachment storage.
///
/// One implementation instance is already scoped to a single character;
/// the pipeline never sees other characters' attachments.
pub trait AttachmentStore: Send + Sync {
    /// Names of all attachments, sorted ascending.
    fn list(&self) -> impl std::future::Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// Read an attachment's content. `Ok(None)` when it does not exist.
    fn read(
        &self,
        name: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Create or overwrite an attachment.
    fn write(
        &self,
        name: &str,
        content: &str,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Delete an attachment. No-op if it does not exist.
    fn delete(&self, name: &str) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}

/// In-memory attachment store for tests and embedded hosts.
#[derive(Default)]
pub struct InMemoryAttachmentStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl InMemoryAttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an attachment synchronously (test setup convenience).
    pub fn seed(&self, name: &str, content: &str) {
        self.entries
            .lock()
            .expect("attachment store lock poisoned")
            .insert(name.to_string(), content.to_string());
    }
}

impl AttachmentStore for InMemoryAttachmentStore {
    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let entries = self.entries.lock().expect("attachment store lock poisoned");
        Ok(entries.keys().cloned().collect())
    }

    async fn read(&self, name: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().expect("attachment store lock poisoned");
        Ok(entries.get(name).cloned())
    }

    async fn write(&self, name: &str, content: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("attachment store lock poisoned");
        entries.insert(name.to_string(), content.to_string());
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("attachment store lock poisoned");
        entries.remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store_roundtrip() {
        let store = InMemoryAttachmentStore::new();
        assert!(store.read("a.md").await.unwrap().is_none());

        store.write("a.md", "hello").await.unwrap();
        assert_eq!(store.read("a.md").await.unwrap().as_deref(), Some("hello"));

        store.write("a.md", "replaced").await.unwrap();
        assert_eq!(store.read("a.md").await.unwrap().as_deref(), Some("replaced"));

        store.delete("a.md").await.unwrap();
        assert!(store.read("a.md").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_in_memory_store_list_sorted() {
        let store = InMemoryAttachmentStore::new();
        store.write("b.md", "").await.unwrap();
        store.write("a.md", "").await.unwrap();
        assert_eq!(store.list().await.unwrap(), vec!["a.md", "b.md"]);
    }
}
