//! Infrastructure layer for Keepsake.
//!
//! Contains implementations of the ports defined in `keepsake-core`:
//! a local-filesystem attachment store, a JSON-file cursor store, and an
//! OpenAI-compatible generation backend adapter.

pub mod attachment;
pub mod cursor;
pub mod llm;
