//! Generation backend request types and errors for Keepsake.
//!
//! The extraction pipeline talks to interchangeable generation backends
//! through a single retry-free call: messages in, raw text out. These are
//! the shapes that cross that boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a message sent to a generation backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A single message in a generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// What a generation backend can handle.
///
/// `max_prompt_chars` marks tightly context-constrained backends (e.g. a
/// small local model): the prompt builder truncates existing memories and
/// recent messages to fit this budget. `None` means no truncation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendCapabilities {
    /// Approximate prompt character budget, if the backend is constrained.
    pub max_prompt_chars: Option<usize>,
    /// Upper bound on response tokens the backend accepts.
    pub max_output_tokens: u32,
}

impl Default for BackendCapabilities {
    fn default() -> Self {
        Self {
            max_prompt_chars: None,
            max_output_tokens: 4096,
        }
    }
}

/// Errors from generation backend operations.
///
/// `Unavailable` is the recognized "backend unavailable" class: the
/// orchestrator aborts the whole operation cleanly with a specific message
/// instead of reporting a generic failure.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("backend unavailable: {message}")]
    Unavailable { message: String },

    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl LlmError {
    /// True for the known capability-failure class that aborts an
    /// operation with a specific user-facing message.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, LlmError::Unavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_role_roundtrip() {
        for role in [MessageRole::System, MessageRole::User, MessageRole::Assistant] {
            let s = role.to_string();
            let parsed: MessageRole = s.parse().unwrap();
            assert_eq!(role, parsed);
        }
    }

    #[test]
    fn test_message_role_rejects_unknown() {
        assert!("narrator".parse::<MessageRole>().is_err());
    }

    #[test]
    fn test_unavailable_classification() {
        let err = LlmError::Unavailable {
            message: "local model not loaded".into(),
        };
        assert!(err.is_unavailable());
        assert!(!LlmError::AuthenticationFailed.is_unavailable());
    }

    #[test]
    fn test_capabilities_default_unconstrained() {
        let caps = BackendCapabilities::default();
        assert!(caps.max_prompt_chars.is_none());
    }
}
