//! Prompt assembly with source-specific truncation.
//!
//! Extraction-specific placeholders are substituted first; generic tokens
//! (`{{char}}`, `{{user}}`, persona macros) are then handed to the host's
//! templater. Backends reporting a prompt character budget get their
//! existing-memories and recent-messages sections truncated to fit, with
//! the split weighted toward recent messages.

use keepsake_types::llm::BackendCapabilities;

/// Marker appended where truncation cut content.
pub const TRUNCATION_MARKER: &str = "[...truncated]";

/// Floor for the content budget after template overhead is subtracted.
const MIN_CONTENT_BUDGET: usize = 1000;

/// Placeholder shown when no memories exist yet.
const NO_MEMORIES_PLACEHOLDER: &str = "(none yet)";

/// Generic placeholder substitution owned by the host.
///
/// The pipeline substitutes its own tokens and then hands the prompt to
/// this port for host macros (`{{char}}`, `{{user}}`, persona text).
pub trait Templater: Send + Sync {
    fn substitute(&self, text: &str) -> String;
}

/// Templater that performs no substitution, for hosts without a macro
/// system and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTemplater;

impl Templater for IdentityTemplater {
    fn substitute(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Truncate `text` to at most `max_chars` characters, cutting at the
/// nearest preceding newline when one falls past half the budget, and
/// appending the truncation marker.
pub fn truncate_at_newline(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut_byte = text
        .char_indices()
        .nth(max_chars)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len());
    let truncated = &text[..cut_byte];

    let kept = match truncated.rfind('\n') {
        Some(newline) if truncated[..newline].chars().count() > max_chars / 2 => {
            &truncated[..newline]
        }
        _ => truncated,
    };
    format!("{kept}\n{TRUNCATION_MARKER}")
}

/// Character count of the template once content placeholders are blanked,
/// i.e. the literal overhead the template itself contributes.
fn extraction_template_overhead(template: &str, char_name: &str, char_card: &str) -> usize {
    template
        .replace("{{charName}}", char_name)
        .replace("{{charCard}}", char_card)
        .replace("{{existingMemories}}", "")
        .replace("{{recentMessages}}", "")
        .chars()
        .count()
}

/// Assemble the extraction prompt.
pub fn build_extraction_prompt(
    template: &str,
    char_name: &str,
    char_card: &str,
    existing_memories: &str,
    recent_messages: &str,
    capabilities: &BackendCapabilities,
    templater: &dyn Templater,
) -> String {
    let mut memories = if existing_memories.trim().is_empty() {
        NO_MEMORIES_PLACEHOLDER.to_string()
    } else {
        existing_memories.to_string()
    };
    let mut messages = recent_messages.to_string();

    if let Some(budget) = capabilities.max_prompt_chars {
        let overhead = extraction_template_overhead(template, char_name, char_card);
        let available = budget.saturating_sub(overhead).max(MIN_CONTENT_BUDGET);
        // One third for existing memories, two thirds for the messages.
        let memories_budget = available / 3;
        let messages_budget = available - memories_budget;
        memories = truncate_at_newline(&memories, memories_budget);
        messages = truncate_at_newline(&messages, messages_budget);
    }

    let prompt = template
        .replace("{{charName}}", char_name)
        .replace("{{charCard}}", char_card)
        .replace("{{existingMemories}}", &memories)
        .replace("{{recentMessages}}", &messages);

    templater.substitute(&prompt)
}

/// Assemble the consolidation prompt over the numbered block listing.
pub fn build_consolidation_prompt(
    template: &str,
    memories_text: &str,
    capabilities: &BackendCapabilities,
    templater: &dyn Templater,
) -> String {
    let mut memories = memories_text.to_string();

    if let Some(budget) = capabilities.max_prompt_chars {
        let overhead = template.replace("{{memories}}", "").chars().count();
        let available = budget.saturating_sub(overhead).max(MIN_CONTENT_BUDGET);
        memories = truncate_at_newline(&memories, available);
    }

    templater.substitute(&template.replace("{{memories}}", &memories))
}
