//! Strip reasoning/thinking wrappers from raw model output.
//!
//! Reasoning-capable models wrap their scratch work in tags like
//! `<think>...</think>` before the actual answer. The pipeline only wants
//! the answer: remove every recognized wrapper, including an unterminated
//! one that swallows the rest of the text.

use std::sync::LazyLock;

use regex::Regex;

static REASONING_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(think|thinking|reasoning|reason)\b[^>]*>.*?</\s*(think|thinking|reasoning|reason)\s*>")
        .expect("reasoning block regex")
});

static UNTERMINATED_REASONING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(think|thinking|reasoning|reason)\b[^>]*>.*\z")
        .expect("unterminated reasoning regex")
});

/// Remove reasoning wrappers and trim surrounding whitespace.
pub fn strip_reasoning(text: &str) -> String {
    let stripped = REASONING_BLOCK.replace_all(text, "");
    let stripped = UNTERMINATED_REASONING.replace(&stripped, "");
    stripped.trim().to_string()
}
