//! Storage ports: attachment documents and cursor metadata.
//!
//! Both traits use native async fn in traits (RPITIT, Rust 2024 edition).
//! Filesystem implementations live in keepsake-infra; in-memory
//! implementations are provided here for tests and embedded hosts.

pub mod attachment;
pub mod cursor;

pub use attachment::{AttachmentStore, InMemoryAttachmentStore};
pub use cursor::{CursorStore, InMemoryCursorStore};
