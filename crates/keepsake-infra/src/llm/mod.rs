//! Generation backend adapters.

pub mod openai_compat;

pub use openai_compat::{OpenAiCompatBackend, OpenAiCompatConfig};
