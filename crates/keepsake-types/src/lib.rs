//! Shared domain types for Keepsake.
//!
//! Keepsake builds a long-term memory store for a conversational character
//! by extracting durable facts from chat history with an LLM. This crate
//! holds the data shapes everything else agrees on: memory blocks and
//! entries, chat turns, extraction cursors, generation backend types, and
//! the error enums. It depends only on serde/chrono/thiserror -- never on
//! IO or runtime crates.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod memory;
