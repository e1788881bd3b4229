//! Local filesystem attachment store.
//!
//! Implements the `AttachmentStore` trait from `keepsake-core` with files
//! stored at `{base_dir}/characters/{character}/attachments/`. One store
//! instance is scoped to a single character, matching the trait contract.

use std::path::{Path, PathBuf};

use tracing::debug;

use keepsake_core::storage::AttachmentStore;
use keepsake_types::error::StoreError;

/// Filesystem-backed attachment store scoped to one character.
///
/// Directory layout:
/// ```text
/// {base_dir}/characters/{character}/attachments/
///   Luna-memories.md
///   Luna-1754481600000.md
/// ```
pub struct LocalAttachmentStore {
    dir: PathBuf,
}

impl LocalAttachmentStore {
    /// Create a store rooted at `base_dir` for `character`.
    ///
    /// The character name is sanitized the same way memory file names are,
    /// so one directory maps to one character.
    pub fn new(base_dir: impl Into<PathBuf>, character: &str) -> Self {
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
            dir: base_dir
                .into()
                .join("characters")
                .join(safe)
                .join("attachments"),
        }
    }

    /// The directory this store reads and writes.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, StoreError> {
        // Attachment names are flat: no separators, no traversal.
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.starts_with('.')
        {
            return Err(StoreError::Malformed(format!(
                "invalid attachment name: '{name}'"
            )));
        }
        Ok(self.dir.join(name))
    }
}

impl AttachmentStore for LocalAttachmentStore {
    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(err) => return Err(err.into()),
        };
        while let Some(entry) = dir.next_entry().await? {
            if entry.file_type().await?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    entries.push(name.to_string());
                }
            }
        }
        entries.sort();
        Ok(entries)
    }

    async fn read(&self, name: &str) -> Result<Option<String>, StoreError> {
        let path = self.resolve(name)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn write(&self, name: &str, content: &str) -> Result<(), StoreError> {
        let path = self.resolve(name)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, content).await?;
        debug!(path = %path.display(), bytes = content.len(), "attachment written");
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let path = self.resolve(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
