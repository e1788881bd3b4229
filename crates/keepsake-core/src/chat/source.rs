//! ChatSource trait definition.
//!
//! The pipeline never owns the conversation; the host exposes it through
//! this accessor. Everything is a cheap synchronous read -- the host keeps
//! the live chat in memory.

use keepsake_types::chat::ChatTurn;

/// Read-only view of the live chat and its character context.
///
/// Implementations live in the host application. `None` returns from
/// `chat_id`/`character_name` mean "no active chat/character", which the
/// orchestrator treats as a guard skip.
pub trait ChatSource: Send + Sync {
    /// Ordered message history of the active chat.
    fn turns(&self) -> Vec<ChatTurn>;

    /// Stable identifier of the active chat, if any.
    fn chat_id(&self) -> Option<String>;

    /// Display name of the active character, if any.
    fn character_name(&self) -> Option<String>;

    /// Character card / description text (empty when unavailable).
    fn character_card(&self) -> String;

    /// True while the host is still streaming a generation into the chat.
    fn is_streaming(&self) -> bool;
}
