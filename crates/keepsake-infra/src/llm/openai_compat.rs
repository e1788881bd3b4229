//! OpenAI-compatible generation backend.
//!
//! One [`OpenAiCompatBackend`] serves every service that speaks the
//! OpenAI chat completions protocol -- the NanoGPT remote service and
//! local OpenAI-compatible servers (llama.cpp, LM Studio) -- via
//! configurable base URLs. Uses [`async_openai`] for type-safe
//! request/response handling.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
};

use keepsake_core::llm::GenerationBackend;
use keepsake_types::llm::{BackendCapabilities, LlmError, Message, MessageRole};

/// Extraction runs slightly warm so summaries do not parrot the chat.
const EXTRACTION_TEMPERATURE: f32 = 0.3;

/// Prompt character budget assumed for small local models.
const LOCAL_SERVER_PROMPT_CHARS: usize = 6000;

/// Configuration for an OpenAI-compatible generation backend.
pub struct OpenAiCompatConfig {
    /// Human-readable backend name (e.g. "nano_gpt", "local").
    pub backend_name: String,
    /// Base URL for the API (e.g. "https://nano-gpt.com/api/v1").
    pub base_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// What this backend can handle.
    pub capabilities: BackendCapabilities,
}

/// NanoGPT default configuration.
///
/// Base URL: `https://nano-gpt.com/api/v1`. No prompt budget: the
/// remote models carry full-size contexts.
pub fn nano_gpt_defaults(api_key: &str, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        backend_name: "nano_gpt".into(),
        base_url: "https://nano-gpt.com/api/v1".into(),
        api_key: api_key.into(),
        model: model.into(),
        capabilities: BackendCapabilities {
            max_prompt_chars: None,
            max_output_tokens: 8192,
        },
    }
}

/// Local OpenAI-compatible server default configuration.
///
/// Local models run with small contexts, so the prompt builder truncates
/// to a fixed character budget. The API key is a placeholder; local
/// servers ignore it.
pub fn local_server_defaults(base_url: &str, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        backend_name: "local".into(),
        base_url: base_url.into(),
        api_key: "dummy-key".into(),
        model: model.into(),
        capabilities: BackendCapabilities {
            max_prompt_chars: Some(LOCAL_SERVER_PROMPT_CHARS),
            max_output_tokens: 2048,
        },
    }
}

// OpenAiCompatBackend intentionally does NOT derive Debug to prevent
// accidental exposure of the API key inside the async-openai Client.

/// Generation backend for any OpenAI-compatible API.
pub struct OpenAiCompatBackend {
    client: Client<OpenAIConfig>,
    backend_name: String,
    model: String,
    capabilities: BackendCapabilities,
}

impl OpenAiCompatBackend {
    /// Create a backend from a configuration.
    pub fn new(config: OpenAiCompatConfig) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.api_key)
            .with_api_base(&config.base_url);

        Self {
            client: Client::with_config(openai_config),
            backend_name: config.backend_name,
            model: config.model,
            capabilities: config.capabilities,
        }
    }

    /// Create a NanoGPT backend.
    pub fn nano_gpt(api_key: &str, model: &str) -> Self {
        Self::new(nano_gpt_defaults(api_key, model))
    }

    /// Create a backend for a local OpenAI-compatible server.
    pub fn local_server(base_url: &str, model: &str) -> Self {
        Self::new(local_server_defaults(base_url, model))
    }

    /// Build a [`CreateChatCompletionRequest`] from pipeline messages.
    fn build_request(
        &self,
        messages: &[Message],
        max_tokens: u32,
    ) -> CreateChatCompletionRequest {
        let messages: Vec<ChatCompletionRequestMessage> = messages
            .iter()
            .map(|msg| match msg.role {
                MessageRole::System => {
                    ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                        content: ChatCompletionRequestSystemMessageContent::Text(
                            msg.content.clone(),
                        ),
                        name: None,
                    })
                }
                MessageRole::User => {
                    ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                        content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                        name: None,
                    })
                }
                MessageRole::Assistant => {
                    #[allow(deprecated)]
                    ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                        content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                            msg.content.clone(),
                        )),
                        refusal: None,
                        name: None,
                        audio: None,
                        tool_calls: None,
                        function_call: None,
                    })
                }
            })
            .collect();

        CreateChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_completion_tokens: Some(max_tokens),
            temperature: Some(EXTRACTION_TEMPERATURE),
            ..Default::default()
        }
    }
}

impl GenerationBackend for OpenAiCompatBackend {
    fn name(&self) -> &str {
        &self.backend_name
    }

    fn capabilities(&self) -> &BackendCapabilities {
        &self.capabilities
    }

    async fn generate(&self, messages: &[Message], max_tokens: u32) -> Result<String, LlmError> {
        let request = self.build_request(messages, max_tokens);

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        // A response with no content is "nothing to add", not an error.
        Ok(response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default())
    }
}

/// Map an `async_openai::error::OpenAIError` to an [`LlmError`].
fn map_openai_error(err: async_openai::error::OpenAIError) -> LlmError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            let error_type = api_err.r#type.as_deref().unwrap_or("");

            if code == "authentication_error"
                || error_type == "authentication_error"
                || api_err.message.contains("Incorrect API key")
                || api_err.message.contains("Invalid API key")
            {
                LlmError::AuthenticationFailed
            } else if code == "rate_limit_exceeded" || error_type == "rate_limit_error" {
                LlmError::RateLimited {
                    retry_after_ms: None,
                }
            } else {
                LlmError::Provider {
                    message: err.to_string(),
                }
            }
        }
        OpenAIError::Reqwest(reqwest_err) => {
            // A server we cannot reach at all is the "backend
            // unavailable" class: the pipeline aborts with a specific
            // message instead of a generic failure.
            if reqwest_err.is_connect() {
                LlmError::Unavailable {
                    message: format!("cannot reach generation backend: {reqwest_err}"),
                }
            } else if let Some(status) = reqwest_err.status() {
                match status.as_u16() {
                    401 => LlmError::AuthenticationFailed,
                    429 => LlmError::RateLimited {
                        retry_after_ms: None,
                    },
                    _ => LlmError::Provider {
                        message: err.to_string(),
                    },
                }
            } else {
                LlmError::Provider {
                    message: err.to_string(),
                }
            }
        }
        OpenAIError::JSONDeserialize(_, content) => {
            LlmError::Deserialization(format!("failed to parse response: {content}"))
        }
        OpenAIError::InvalidArgument(msg) => LlmError::InvalidRequest(msg.clone()),
        _ => LlmError::Provider {
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nano_gpt_defaults() {
        let config = nano_gpt_defaults("ng-test", "gpt-4.1-nano");
        assert_eq!(config.backend_name, "nano_gpt");
        assert_eq!(config.base_url, "https://nano-gpt.com/api/v1");
        assert_eq!(config.model, "gpt-4.1-nano");
        assert!(config.capabilities.max_prompt_chars.is_none());
    }

    #[test]
    fn test_local_server_defaults_are_constrained() {
        let config = local_server_defaults("http://localhost:8080/v1", "qwen2.5-3b");
        assert_eq!(config.backend_name, "local");
        assert_eq!(
            config.capabilities.max_prompt_chars,
            Some(LOCAL_SERVER_PROMPT_CHARS)
        );
    }

    #[test]
    fn test_build_request_maps_roles_and_limits() {
        let backend = OpenAiCompatBackend::nano_gpt("ng-test", "gpt-4.1-nano");
        let request = backend.build_request(
            &[
                Message::system("You are a memory extraction assistant."),
                Message::user("extract from this"),
            ],
            500,
        );
        assert_eq!(request.model, "gpt-4.1-nano");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.max_completion_tokens, Some(500));
        assert_eq!(request.temperature, Some(EXTRACTION_TEMPERATURE));
        assert!(matches!(
            request.messages[0],
            ChatCompletionRequestMessage::System(_)
        ));
        assert!(matches!(
            request.messages[1],
            ChatCompletionRequestMessage::User(_)
        ));
    }
}
