//! Extraction and consolidation pipeline for Keepsake.
//!
//! This crate defines the "ports" (collaborator traits) that the host and
//! the infrastructure layer implement -- chat access, attachment storage,
//! cursor metadata, template substitution, generation backends -- and the
//! pipeline built on top of them: the memory block codec, the message
//! window selector, the prompt builder, the extraction orchestrator, and
//! the consolidation engine. It depends only on `keepsake-types`, never on
//! `keepsake-infra` or any IO crate.

pub mod chat;
pub mod llm;
pub mod memory;
pub mod pipeline;
pub mod prompt;
pub mod storage;
pub mod window;
