//! JSON-file cursor store.
//!
//! Implements the `CursorStore` trait from `keepsake-core` with one JSON
//! document holding both the per-chat cursors and the batch-cursor map.
//! Writes are whole-document read-modify-write, serialized by an async
//! mutex: the pipeline persists the cursor after every chunk and two
//! concurrent writers would otherwise lose updates.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use keepsake_core::storage::CursorStore;
use keepsake_types::chat::ExtractionCursor;
use keepsake_types::error::StoreError;

/// On-disk shape of the cursor document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CursorDocument {
    #[serde(default)]
    cursors: BTreeMap<String, ExtractionCursor>,
    #[serde(default)]
    batch: BTreeMap<String, i64>,
}

/// Cursor store persisted as a single JSON file.
pub struct JsonCursorStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonCursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn load_document(&self) -> Result<CursorDocument, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|err| StoreError::Malformed(err.to_string())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(CursorDocument::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn save_document(&self, document: &CursorDocument) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(document)
            .map_err(|err| StoreError::Malformed(err.to_string()))?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}

impl CursorStore for JsonCursorStore {
    async fn load(&self, chat_id: &str) -> Result<Option<ExtractionCursor>, StoreError> {
        Ok(self.load_document().await?.cursors.get(chat_id).copied())
    }

    async fn save(&self, chat_id: &str, cursor: &ExtractionCursor) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load_document().await?;
        document.cursors.insert(chat_id.to_string(), *cursor);
        self.save_document(&document).await
    }

    async fn clear(&self, chat_id: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load_document().await?;
        document.cursors.remove(chat_id);
        self.save_document(&document).await
    }

    async fn load_batch(&self) -> Result<BTreeMap<String, i64>, StoreError> {
        Ok(self.load_document().await?.batch)
    }

    async fn save_batch(&self, cursors: &BTreeMap<String, i64>) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load_document().await?;
        document.batch = cursors.clone();
        self.save_document(&document).await
    }
}
