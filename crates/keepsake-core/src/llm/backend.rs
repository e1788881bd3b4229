//! GenerationBackend trait definition.
//!
//! Uses native async fn in traits (RPITIT, Rust 2024 edition). The boxed
//! object-safe wrapper lives in `boxed`.

use keepsake_types::llm::{BackendCapabilities, LlmError, Message};

/// A generation backend the pipeline can dispatch a prompt to.
///
/// The contract is a single call with no internal retry: the orchestrator
/// treats every call as at-most-once and never re-sends a chunk. A backend
/// that cannot run at all (e.g. an optional local model that is not
/// loaded) reports [`LlmError::Unavailable`] so the whole operation aborts
/// with a specific message.
pub trait GenerationBackend: Send + Sync {
    /// Human-readable backend name (e.g. "nano_gpt", "local").
    fn name(&self) -> &str;

    /// Prompt budget and output limits for this backend.
    fn capabilities(&self) -> &BackendCapabilities;

    /// Send the messages and return the raw response text.
    fn generate(
        &self,
        messages: &[Message],
        max_tokens: u32,
    ) -> impl std::future::Future<Output = Result<String, LlmError>> + Send;
}
