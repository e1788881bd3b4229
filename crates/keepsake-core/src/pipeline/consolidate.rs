//! The consolidation engine.
//!
//! Consolidation asks the model to merge and deduplicate the existing
//! blocks in a single call. The manual path is two-phase: `consolidate()`
//! produces a preview the host must confirm, `commit_consolidation()`
//! writes it (snapshotting the prior store for one-level undo). The
//! automatic post-extraction pass reuses the same machinery scoped to one
//! conversation's blocks and commits without preview.

use serde::Serialize;
use tracing::{debug, error, info, warn};

use keepsake_types::config::MemorySettings;
use keepsake_types::error::StoreError;
use keepsake_types::llm::{LlmError, Message};
use keepsake_types::memory::{MemoryBlock, MemoryEntry, SOURCE_CONSOLIDATED};

use crate::chat::ChatSource;
use crate::llm::strip_reasoning;
use crate::memory::MemoryStorage;
use crate::memory::block::{
    bullet_lines, count_bullets, current_timestamp, parse_response_entries,
};
use crate::pipeline::orchestrator::MemoryPipeline;
use crate::prompt::{Templater, build_consolidation_prompt};
use crate::storage::CursorStore;

const CONSOLIDATION_SYSTEM_PROMPT: &str = "You are a memory consolidation assistant.";

/// Side-by-side view of a pending consolidation, shown to the user
/// before anything is written.
#[derive(Debug, Clone, Serialize)]
pub struct ConsolidationPreview {
    pub before: Vec<MemoryBlock>,
    pub after: Vec<MemoryBlock>,
    /// Total bullets before/after, for the confirmation dialog.
    pub before_count: usize,
    pub after_count: usize,
    /// Serialized pre-consolidation store, kept for undo on commit.
    pub snapshot: String,
}

/// Why a consolidation request was dropped without a model call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ConsolidationSkip {
    /// Another extraction or consolidation is in flight.
    AlreadyRunning,
    /// The per-entry storage schema has no consolidation.
    Unsupported,
    /// Fewer than two blocks exist; nothing to merge.
    NotEnoughMemories,
}

/// Terminal state of one `consolidate()` invocation. Like extraction,
/// callers never receive a raw error.
#[derive(Debug)]
pub enum ConsolidationOutcome {
    Skipped(ConsolidationSkip),
    /// The model returned nothing usable; the store is untouched.
    Unchanged,
    /// A preview awaiting `commit_consolidation()`.
    Pending(ConsolidationPreview),
    Failed { message: String },
}

/// Render blocks for the consolidation prompt as numbered sections.
fn numbered_blocks_text(blocks: &[MemoryBlock]) -> String {
    blocks
        .iter()
        .enumerate()
        .map(|(i, block)| {
            let bullets = block
                .bullets
                .iter()
                .map(|b| format!("- {b}"))
                .collect::<Vec<_>>()
                .join("\n");
            format!("[Block {}]\n{}", i + 1, bullets)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Parse the consolidation response into blocks tagged with `source_id`.
fn blocks_from_response(response: &str, source_id: &str) -> Vec<MemoryBlock> {
    let date = current_timestamp();
    parse_response_entries(response, false)
        .into_iter()
        .map(|body| {
            let mut bullets = bullet_lines(&body);
            if bullets.is_empty() {
                bullets.push(body);
            }
            MemoryBlock::new(source_id, date.clone(), bullets)
        })
        .collect()
}

impl<S, C, H, T> MemoryPipeline<S, C, H, T>
where
    S: MemoryStorage,
    C: CursorStore,
    H: ChatSource,
    T: Templater,
{
    /// Dispatch one consolidation call over `blocks` and parse the result.
    async fn consolidation_pass(
        &self,
        settings: &MemorySettings,
        blocks: &[MemoryBlock],
        result_source: &str,
    ) -> Result<Vec<MemoryBlock>, LlmError> {
        let prompt = build_consolidation_prompt(
            &settings.consolidation_prompt,
            &numbered_blocks_text(blocks),
            self.backend().capabilities(),
            self.templater(),
        );
        let messages = [
            Message::system(CONSOLIDATION_SYSTEM_PROMPT),
            Message::user(prompt),
        ];
        // Consolidation output replaces its input, so it gets double the
        // extraction response budget.
        let raw = self
            .backend()
            .generate(&messages, settings.response_tokens * 2)
            .await?;

        let clean = strip_reasoning(&raw);
        if clean.is_empty() {
            return Ok(Vec::new());
        }
        Ok(blocks_from_response(&clean, result_source))
    }

    /// Prepare a consolidation of the whole store. Requires at least two
    /// blocks; returns a preview the host must confirm before anything is
    /// written.
    #[tracing::instrument(name = "consolidate", skip(self))]
    pub async fn consolidate(&self) -> ConsolidationOutcome {
        let Some(_guard) = self.try_begin() else {
            debug!("operation already in flight, dropping consolidation request");
            return ConsolidationOutcome::Skipped(ConsolidationSkip::AlreadyRunning);
        };
        if !self.storage().supports_consolidation() {
            return ConsolidationOutcome::Skipped(ConsolidationSkip::Unsupported);
        }
        let settings = self.settings();

        let blocks = match self.blocks().await {
            Ok(blocks) => blocks,
            Err(err) => {
                error!(error = %err, "failed to read memory store");
                return ConsolidationOutcome::Failed {
                    message: "Memory consolidation failed".to_string(),
                };
            }
        };
        if blocks.len() < 2 {
            return ConsolidationOutcome::Skipped(ConsolidationSkip::NotEnoughMemories);
        }

        let snapshot = match self.storage().snapshot().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!(error = %err, "failed to snapshot memory store");
                return ConsolidationOutcome::Failed {
                    message: "Memory consolidation failed".to_string(),
                };
            }
        };

        let before_count = count_bullets(&blocks);
        info!(blocks = blocks.len(), bullets = before_count, "consolidating memories");

        let after = match self
            .consolidation_pass(&settings, &blocks, SOURCE_CONSOLIDATED)
            .await
        {
            Ok(after) => after,
            Err(err) if err.is_unavailable() => {
                warn!(backend = self.backend().name(), error = %err, "backend unavailable");
                return ConsolidationOutcome::Failed {
                    message: err.to_string(),
                };
            }
            Err(err) => {
                error!(error = %err, "consolidation call failed");
                return ConsolidationOutcome::Failed {
                    message: "Memory consolidation failed".to_string(),
                };
            }
        };
        if after.is_empty() {
            info!("consolidation returned nothing, store unchanged");
            return ConsolidationOutcome::Unchanged;
        }

        let after_count = count_bullets(&after);
        ConsolidationOutcome::Pending(ConsolidationPreview {
            before: blocks,
            after,
            before_count,
            after_count,
            snapshot,
        })
    }

    /// Commit a confirmed consolidation: snapshot the prior store for
    /// undo, then replace it with the consolidated blocks.
    pub async fn commit_consolidation(
        &self,
        preview: ConsolidationPreview,
    ) -> Result<(), StoreError> {
        let entries: Vec<MemoryEntry> =
            preview.after.into_iter().map(MemoryEntry::from).collect();
        self.storage().replace_all(&entries).await?;
        *self
            .consolidation_backup
            .lock()
            .expect("backup lock poisoned") = Some(preview.snapshot);
        info!(
            before = preview.before_count,
            after = preview.after_count,
            "consolidation committed"
        );
        Ok(())
    }

    /// Restore the pre-consolidation store. Single-use: the backup is
    /// cleared on success. Returns false when there is nothing to undo.
    pub async fn undo_consolidation(&self) -> Result<bool, StoreError> {
        let backup = self
            .consolidation_backup
            .lock()
            .expect("backup lock poisoned")
            .take();
        let Some(snapshot) = backup else {
            return Ok(false);
        };
        if let Err(err) = self.storage().restore(&snapshot).await {
            // Keep the backup so the user can retry.
            *self
                .consolidation_backup
                .lock()
                .expect("backup lock poisoned") = Some(snapshot);
            return Err(err);
        }
        info!("consolidation undone, memories restored");
        Ok(true)
    }

    /// The automatic post-extraction pass, scoped to one conversation.
    ///
    /// Triggered when that conversation's bullet count exceeds the
    /// configured threshold after a multi-chunk run. Other conversations'
    /// blocks are left untouched; the scoped result keeps the
    /// conversation's source id so its blocks stay associated with the
    /// chat. Commits without preview; the caller treats failure as
    /// non-fatal.
    pub(crate) async fn auto_consolidate(
        &self,
        settings: &MemorySettings,
        source_id: &str,
    ) -> Result<bool, StoreError> {
        let blocks = self.blocks().await?;
        let scoped: Vec<MemoryBlock> = blocks
            .iter()
            .filter(|b| b.source_id == source_id)
            .cloned()
            .collect();
        if scoped.is_empty()
            || count_bullets(&scoped) <= settings.auto_consolidate_threshold as usize
        {
            return Ok(false);
        }

        info!(
            chat = %source_id,
            bullets = count_bullets(&scoped),
            threshold = settings.auto_consolidate_threshold,
            "auto-consolidating conversation memories"
        );
        let consolidated = match self.consolidation_pass(settings, &scoped, source_id).await {
            Ok(consolidated) => consolidated,
            Err(err) => {
                warn!(error = %err, "auto-consolidation call failed");
                return Ok(false);
            }
        };
        if consolidated.is_empty() {
            return Ok(false);
        }

        let mut replacement: Vec<MemoryEntry> = blocks
            .into_iter()
            .filter(|b| b.source_id != source_id)
            .map(MemoryEntry::from)
            .collect();
        replacement.extend(consolidated.into_iter().map(MemoryEntry::from));
        self.storage().replace_all(&replacement).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(src: &str, bullets: &[&str]) -> MemoryBlock {
        MemoryBlock::new(src, "2026-08-06 12:00", bullets.iter().map(|b| b.to_string()).collect())
    }

    #[test]
    fn test_numbered_blocks_text() {
        let text = numbered_blocks_text(&[block("a", &["x", "y"]), block("b", &["z"])]);
        assert_eq!(text, "[Block 1]\n- x\n- y\n\n[Block 2]\n- z");
    }

    #[test]
    fn test_blocks_from_response_tags_source() {
        let response = "<memory>\n- merged fact\n</memory>";
        let blocks = blocks_from_response(response, SOURCE_CONSOLIDATED);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].source_id, "consolidated");
        assert_eq!(blocks[0].bullets, vec!["merged fact"]);
    }

    #[test]
    fn test_blocks_from_response_fallback_single_bullet() {
        let blocks = blocks_from_response("unstructured answer", "chat1");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].bullets, vec!["unstructured answer"]);
    }
}
