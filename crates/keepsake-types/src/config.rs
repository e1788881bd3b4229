//! Pipeline settings for Keepsake.
//!
//! All thresholds here are policy, not semantics: the defaults mirror the
//! behavior the pipeline was tuned with, and hosts may persist and edit the
//! whole struct (it round-trips through TOML and JSON).

use serde::{Deserialize, Serialize};

/// Default prompt for the extraction pass.
///
/// Placeholders: `{{charName}}`, `{{charCard}}`, `{{existingMemories}}`,
/// `{{recentMessages}}` are substituted by the prompt builder; anything
/// else (e.g. `{{char}}`, `{{user}}`) is left to the host templater.
pub const DEFAULT_EXTRACTION_PROMPT: &str = r#"You are a memory extraction assistant. Read the recent chat messages and extract important character memories.

Character name: {{charName}}

CHARACTER CARD:
{{charCard}}

EXISTING MEMORIES (do NOT repeat these):
{{existingMemories}}

RECENT CHAT MESSAGES:
{{recentMessages}}

INSTRUCTIONS:
1. Extract only NEW facts, events, relationships, emotional moments, or significant details NOT already in existing memories.
2. Summarize in third person. Do NOT copy or quote text from the chat verbatim.
3. Do NOT use emojis anywhere in the output.
4. Each memory must be wrapped in <memory></memory> tags.
5. Inside each <memory> block, use a markdown bulleted list (lines starting with "- ").
6. Each bullet should be one concise fact or detail about {{char}}.
7. If nothing genuinely new or significant to extract, respond with exactly: NO_NEW_MEMORIES
8. Do NOT extract trivial conversation filler.

EXAMPLE OUTPUT FORMAT:
<memory>
- {{char}} revealed that she grew up in a coastal village north of the capital.
- She mentioned having two older brothers who work as fishermen.
</memory>
<memory>
- {{char}} became visibly upset when the topic of her father was raised.
- She refused to elaborate and changed the subject quickly.
</memory>

Output ONLY <memory> blocks (or NO_NEW_MEMORIES). No headers, no commentary, no extra text."#;

/// Default prompt for the consolidation pass.
///
/// Placeholder: `{{memories}}` receives the numbered block listing.
pub const DEFAULT_CONSOLIDATION_PROMPT: &str = r#"You are a memory consolidation assistant. Review the following character memories and consolidate them.

RULES:
1. Merge duplicate or near-duplicate memories into one.
2. Combine closely related facts about the same event or topic.
3. Preserve all unique information. Do NOT discard distinct memories.
4. Summarize in third person. Do NOT copy text verbatim from the input.
5. Do NOT use emojis anywhere in the output.
6. Each consolidated memory must be wrapped in <memory></memory> tags.
7. Inside each <memory> block, use a markdown bulleted list (lines starting with "- ").

MEMORIES TO CONSOLIDATE:
{{memories}}

Output ONLY <memory> blocks. No headers, no commentary, no extra text."#;

/// The literal sentinel a backend returns when a chunk yields nothing new.
pub const NO_NEW_MEMORIES: &str = "NO_NEW_MEMORIES";

/// Smallest chunk size the window selector will operate with.
pub const MIN_CHUNK_SIZE: u32 = 5;

fn default_enabled() -> bool {
    true
}

fn default_interval() -> u32 {
    10
}

fn default_chunk_size() -> u32 {
    20
}

fn default_response_tokens() -> u32 {
    500
}

fn default_extraction_prompt() -> String {
    DEFAULT_EXTRACTION_PROMPT.to_string()
}

fn default_consolidation_prompt() -> String {
    DEFAULT_CONSOLIDATION_PROMPT.to_string()
}

fn default_auto_consolidate_threshold() -> u32 {
    20
}

fn default_cooldown_secs() -> u64 {
    60
}

fn default_multi_chunk_confirm_threshold() -> u32 {
    3
}

/// Pipeline configuration, persisted by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySettings {
    /// Master switch for automatic extraction. Forced runs ignore it.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Character messages between automatic extraction triggers.
    #[serde(default = "default_interval")]
    pub interval: u32,

    /// Maximum messages per extraction chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Response token budget per extraction call (consolidation uses 2x).
    #[serde(default = "default_response_tokens")]
    pub response_tokens: u32,

    /// Extraction prompt template.
    #[serde(default = "default_extraction_prompt")]
    pub extraction_prompt: String,

    /// Consolidation prompt template.
    #[serde(default = "default_consolidation_prompt")]
    pub consolidation_prompt: String,

    /// Keep one memory store per chat instead of one per character.
    #[serde(default)]
    pub per_chat_store: bool,

    /// Bullet count for one conversation above which a multi-chunk run
    /// triggers an automatic consolidation pass for that conversation.
    #[serde(default = "default_auto_consolidate_threshold")]
    pub auto_consolidate_threshold: u32,

    /// Minimum seconds between automatic extractions (manual runs bypass).
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Forced runs spanning more than this many chunks require
    /// confirmation unless running headless.
    #[serde(default = "default_multi_chunk_confirm_threshold")]
    pub multi_chunk_confirm_threshold: u32,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval: default_interval(),
            chunk_size: default_chunk_size(),
            response_tokens: default_response_tokens(),
            extraction_prompt: default_extraction_prompt(),
            consolidation_prompt: default_consolidation_prompt(),
            per_chat_store: false,
            auto_consolidate_threshold: default_auto_consolidate_threshold(),
            cooldown_secs: default_cooldown_secs(),
            multi_chunk_confirm_threshold: default_multi_chunk_confirm_threshold(),
        }
    }
}

impl MemorySettings {
    /// Chunk size with the floor applied.
    pub fn effective_chunk_size(&self) -> usize {
        self.chunk_size.max(MIN_CHUNK_SIZE) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_mirror_tuned_values() {
        let settings = MemorySettings::default();
        assert!(settings.enabled);
        assert_eq!(settings.interval, 10);
        assert_eq!(settings.chunk_size, 20);
        assert_eq!(settings.response_tokens, 500);
        assert_eq!(settings.auto_consolidate_threshold, 20);
        assert_eq!(settings.cooldown_secs, 60);
        assert_eq!(settings.multi_chunk_confirm_threshold, 3);
        assert!(!settings.per_chat_store);
    }

    #[test]
    fn test_chunk_size_floor() {
        let settings = MemorySettings {
            chunk_size: 2,
            ..Default::default()
        };
        assert_eq!(settings.effective_chunk_size(), MIN_CHUNK_SIZE as usize);
    }

    #[test]
    fn test_extraction_prompt_placeholders() {
        for token in [
            "{{charName}}",
            "{{charCard}}",
            "{{existingMemories}}",
            "{{recentMessages}}",
        ] {
            assert!(DEFAULT_EXTRACTION_PROMPT.contains(token), "missing {token}");
        }
        assert!(DEFAULT_EXTRACTION_PROMPT.contains(NO_NEW_MEMORIES));
    }

    #[test]
    fn test_consolidation_prompt_placeholder() {
        assert!(DEFAULT_CONSOLIDATION_PROMPT.contains("{{memories}}"));
    }

    #[test]
    fn test_settings_toml_roundtrip() {
        let settings = MemorySettings {
            interval: 5,
            per_chat_store: true,
            ..Default::default()
        };
        let text = toml::to_string(&settings).unwrap();
        let parsed: MemorySettings = toml::from_str(&text).unwrap();
        assert_eq!(parsed.interval, 5);
        assert!(parsed.per_chat_store);
        assert_eq!(parsed.chunk_size, settings.chunk_size);
    }

    #[test]
    fn test_settings_fill_missing_fields_with_defaults() {
        let parsed: MemorySettings = toml::from_str("interval = 3").unwrap();
        assert_eq!(parsed.interval, 3);
        assert_eq!(parsed.chunk_size, 20);
        assert!(parsed.enabled);
    }
}
