//! Chat turn and extraction cursor types for Keepsake.
//!
//! A `ChatTurn` is the pipeline's view of one host chat message; the
//! `ExtractionCursor` records how far extraction has progressed through a
//! chat. Cursor mutation is owned by the extraction orchestrator.

use serde::{Deserialize, Serialize};

/// One message of a conversation, as exposed by the host chat accessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Display name of the speaker. Empty for unnamed narrator/system turns.
    pub speaker: String,
    /// Raw message body (may contain markdown and HTML).
    pub text: String,
    /// True for system/narrator messages.
    pub is_system: bool,
    /// True for messages authored by the user.
    pub is_user: bool,
}

impl ChatTurn {
    /// A regular character message.
    pub fn character(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
            is_system: false,
            is_user: false,
        }
    }

    /// A user-authored message.
    pub fn user(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
            is_system: false,
            is_user: true,
        }
    }

    /// A system/narrator message with an optional display name.
    pub fn system(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
            is_system: true,
            is_user: false,
        }
    }
}

/// Per-chat extraction progress.
///
/// `last_extracted_index` is the index of the last message already covered
/// by extraction; `-1` means nothing has been extracted yet.
/// `messages_since_extraction` counts character messages rendered since the
/// last run and drives automatic triggering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionCursor {
    pub last_extracted_index: i64,
    pub messages_since_extraction: u32,
}

impl Default for ExtractionCursor {
    fn default() -> Self {
        Self {
            last_extracted_index: -1,
            messages_since_extraction: 0,
        }
    }
}

impl ExtractionCursor {
    /// Reset to the pristine "nothing extracted" state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Number of messages not yet covered, given the chat length.
    pub fn unextracted(&self, message_count: usize) -> usize {
        let next = self.last_extracted_index + 1;
        (message_count as i64 - next).max(0) as usize
    }
}

/// A background-fetched chat history processed in batch mode.
///
/// Batch chats are not the live chat: their cursors live in the global
/// batch-cursor map rather than in chat-scoped metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchChat {
    /// Stable identifier for the chat (e.g. its filename).
    pub id: String,
    /// Ordered message history.
    pub turns: Vec<ChatTurn>,
}
