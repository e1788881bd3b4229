//! BoxGenerationBackend -- object-safe dynamic dispatch wrapper.
//!
//! `GenerationBackend` uses RPITIT and cannot be a trait object directly.
//! The wrapper follows the usual three steps:
//! 1. Define an object-safe `GenerationBackendDyn` trait with boxed futures
//! 2. Blanket-impl `GenerationBackendDyn` for all `T: GenerationBackend`
//! 3. `BoxGenerationBackend` wraps `Box<dyn GenerationBackendDyn>` and
//!    delegates

use std::future::Future;
use std::pin::Pin;

use keepsake_types::llm::{BackendCapabilities, LlmError, Message};

use super::backend::GenerationBackend;

/// Object-safe version of [`GenerationBackend`] with boxed futures.
pub trait GenerationBackendDyn: Send + Sync {
    fn name(&self) -> &str;

    fn capabilities(&self) -> &BackendCapabilities;

    fn generate_boxed<'a>(
        &'a self,
        messages: &'a [Message],
        max_tokens: u32,
    ) -> Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>>;
}

impl<T: GenerationBackend> GenerationBackendDyn for T {
    fn name(&self) -> &str {
        GenerationBackend::name(self)
    }

    fn capabilities(&self) -> &BackendCapabilities {
        GenerationBackend::capabilities(self)
    }

    fn generate_boxed<'a>(
        &'a self,
        messages: &'a [Message],
        max_tokens: u32,
    ) -> Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>> {
        Box::pin(self.generate(messages, max_tokens))
    }
}

/// Type-erased generation backend for runtime selection.
pub struct BoxGenerationBackend {
    inner: Box<dyn GenerationBackendDyn + Send + Sync>,
}

impl BoxGenerationBackend {
    /// Wrap a concrete backend in a type-erased box.
    pub fn new<T: GenerationBackend + 'static>(backend: T) -> Self {
        Self {
            inner: Box::new(backend),
        }
    }

    /// Human-readable backend name.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Prompt budget and output limits for this backend.
    pub fn capabilities(&self) -> &BackendCapabilities {
        self.inner.capabilities()
    }

    /// Send the messages and return the raw response text.
    pub async fn generate(&self, messages: &[Message], max_tokens: u32) -> Result<String, LlmError> {
        self.inner.generate_boxed(messages, max_tokens).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl GenerationBackend for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn capabilities(&self) -> &BackendCapabilities {
            static CAPS: BackendCapabilities = BackendCapabilities {
                max_prompt_chars: None,
                max_output_tokens: 64,
            };
            &CAPS
        }

        async fn generate(&self, messages: &[Message], _max_tokens: u32) -> Result<String, LlmError> {
            Ok(messages.last().map(|m| m.content.clone()).unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn test_boxed_backend_delegates() {
        let backend = BoxGenerationBackend::new(Echo);
        assert_eq!(backend.name(), "echo");
        let out = backend
            .generate(&[Message::user("ping")], 16)
            .await
            .unwrap();
        assert_eq!(out, "ping");
    }
}
