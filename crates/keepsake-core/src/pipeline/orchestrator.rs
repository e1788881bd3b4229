//! The extraction orchestrator.
//!
//! `MemoryPipeline` drives multi-chunk extraction over the collaborator
//! ports: it checks the entry guards, slices the message window chunk by
//! chunk, dispatches prompts, persists parsed memories and the cursor
//! after every chunk, and finishes with merge and an optional automatic
//! consolidation pass. Chunks are strictly sequential -- each prompt sees
//! the memories written by the chunk before it.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use keepsake_types::chat::{ChatTurn, ExtractionCursor};
use keepsake_types::config::{MemorySettings, NO_NEW_MEMORIES};
use keepsake_types::error::StoreError;
use keepsake_types::llm::Message;
use keepsake_types::memory::{MemoryBlock, MemoryEntry};

use crate::chat::ChatSource;
use crate::llm::{BoxGenerationBackend, strip_reasoning};
use crate::memory::MemoryStorage;
use crate::memory::block::{
    count_bullets, current_timestamp, merge_blocks, parse_response_entries, serialize_blocks,
};
use crate::pipeline::outcome::{
    ExtractOptions, ExtractionOutcome, ExtractionReport, ProgressEvent, SkipReason,
};
use crate::prompt::{Templater, build_extraction_prompt};
use crate::storage::CursorStore;
use crate::window::{chunk_count, select_window, strip_html_tags, unprocessed_span};

const EXTRACTION_SYSTEM_PROMPT: &str = "You are a memory extraction assistant.";

/// Generic user-facing failure notice; detail goes to the log.
const GENERIC_FAILURE: &str = "Memory extraction failed";

/// How the chunk loop ended.
enum LoopEnd {
    /// Every planned chunk ran (or the window was exhausted early).
    Completed,
    /// The cancellation token fired between chunks.
    Cancelled,
    /// A chunk produced zero extractable text after filtering; the run
    /// stops rather than guessing at retry semantics.
    EmptyChunk,
    /// The backend reported it cannot run at all.
    BackendUnavailable(String),
    /// Any other chunk-level failure (generation, parse-side IO, store).
    Failed(String),
}

/// Counters accumulated across the chunk loop.
#[derive(Debug)]
struct RunStats {
    chunks: u32,
    memories: u32,
    last_index: i64,
    chats: u32,
}

impl RunStats {
    fn new() -> Self {
        Self {
            chunks: 0,
            memories: 0,
            last_index: -1,
            chats: 0,
        }
    }

    fn into_report(self, run_id: Uuid, auto_consolidated: bool) -> ExtractionReport {
        ExtractionReport {
            run_id,
            total_memories: self.memories,
            chunks_processed: self.chunks,
            last_extracted_index: self.last_index,
            auto_consolidated,
            chats_processed: self.chats,
        }
    }
}

/// Everything the chunk loop needs to know about one chat.
struct ChunkRun<'a> {
    settings: &'a MemorySettings,
    turns: &'a [ChatTurn],
    /// Conversation identifier new blocks are tagged with, and the cursor
    /// key for this chat.
    source_id: &'a str,
    char_name: &'a str,
    char_card: &'a str,
    end_index: Option<usize>,
    total_chunks: usize,
    /// Live chats persist to chat metadata; batch chats to the batch map.
    live: bool,
}

/// RAII release for the single-flight flag.
pub(crate) struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Stateful extraction/consolidation pipeline for one character context.
///
/// The in-flight flag is per instance, not global: independent character
/// sessions can run their own pipelines concurrently.
pub struct MemoryPipeline<S, C, H, T>
where
    S: MemoryStorage,
    C: CursorStore,
    H: ChatSource,
    T: Templater,
{
    settings: Mutex<MemorySettings>,
    storage: S,
    backend: BoxGenerationBackend,
    cursors: C,
    chat: H,
    templater: T,
    in_flight: AtomicBool,
    /// Start of the most recent run; drives the automatic cooldown gate.
    /// Process-local by design: resets on reload.
    cooldown_started: Mutex<Option<Instant>>,
    pub(crate) consolidation_backup: Mutex<Option<String>>,
}

impl<S, C, H, T> MemoryPipeline<S, C, H, T>
where
    S: MemoryStorage,
    C: CursorStore,
    H: ChatSource,
    T: Templater,
{
    pub fn new(
        settings: MemorySettings,
        storage: S,
        backend: BoxGenerationBackend,
        cursors: C,
        chat: H,
        templater: T,
    ) -> Self {
        Self {
            settings: Mutex::new(settings),
            storage,
            backend,
            cursors,
            chat,
            templater,
            in_flight: AtomicBool::new(false),
            cooldown_started: Mutex::new(None),
            consolidation_backup: Mutex::new(None),
        }
    }

    /// Current settings snapshot.
    pub fn settings(&self) -> MemorySettings {
        self.settings.lock().expect("settings lock poisoned").clone()
    }

    /// Replace the settings (host applied a config change).
    pub fn set_settings(&self, settings: MemorySettings) {
        *self.settings.lock().expect("settings lock poisoned") = settings;
    }

    pub(crate) fn storage(&self) -> &S {
        &self.storage
    }

    pub(crate) fn backend(&self) -> &BoxGenerationBackend {
        &self.backend
    }

    pub(crate) fn templater(&self) -> &T {
        &self.templater
    }

    /// Acquire the single-flight flag. `None` means another extraction or
    /// consolidation is in flight and this request is dropped.
    pub(crate) fn try_begin(&self) -> Option<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
            .then_some(InFlight(&self.in_flight))
    }

    fn note_run_started(&self) {
        *self
            .cooldown_started
            .lock()
            .expect("cooldown lock poisoned") = Some(Instant::now());
    }

    fn cooldown_remaining(&self, settings: &MemorySettings) -> Option<Duration> {
        let started = (*self
            .cooldown_started
            .lock()
            .expect("cooldown lock poisoned"))?;
        let window = Duration::from_secs(settings.cooldown_secs);
        window.checked_sub(started.elapsed()).filter(|d| !d.is_zero())
    }

    /// Serialized view of the current store for the extraction prompt.
    ///
    /// Re-read before every chunk so each prompt sees memories written by
    /// prior chunks in the same run.
    async fn existing_memories_text(&self) -> Result<String, StoreError> {
        let blocks: Vec<MemoryBlock> = self
            .storage
            .load()
            .await?
            .into_iter()
            .map(MemoryBlock::from)
            .collect();
        Ok(serialize_blocks(&blocks))
    }

    async fn persist_cursor(
        &self,
        run: &ChunkRun<'_>,
        cursor: &ExtractionCursor,
    ) -> Result<(), StoreError> {
        if run.live {
            self.cursors.save(run.source_id, cursor).await
        } else {
            let mut batch = self.cursors.load_batch().await?;
            batch.insert(run.source_id.to_string(), cursor.last_extracted_index);
            self.cursors.save_batch(&batch).await
        }
    }

    /// Run extraction. Never raises: every path folds into an
    /// [`ExtractionOutcome`].
    #[tracing::instrument(name = "extract", skip(self, options), fields(force = options.force))]
    pub async fn extract(&self, options: ExtractOptions) -> ExtractionOutcome {
        let Some(_guard) = self.try_begin() else {
            debug!("extraction already in flight, dropping request");
            return ExtractionOutcome::Skipped(SkipReason::AlreadyRunning);
        };
        let settings = self.settings();

        if !settings.enabled && !options.force {
            return ExtractionOutcome::Skipped(SkipReason::Disabled);
        }

        // Cooldown applies to automatic triggers only.
        if !options.force {
            if let Some(remaining) = self.cooldown_remaining(&settings) {
                let remaining_secs = remaining.as_secs().max(1);
                debug!(remaining_secs, "cooldown active, skipping automatic extraction");
                return ExtractionOutcome::Skipped(SkipReason::CooldownActive { remaining_secs });
            }
        }

        if !options.chats.is_empty() {
            return self.extract_batch(&settings, &options).await;
        }
        self.extract_live(&settings, &options).await
    }

    async fn extract_live(
        &self,
        settings: &MemorySettings,
        options: &ExtractOptions,
    ) -> ExtractionOutcome {
        let run_id = Uuid::now_v7();

        let (Some(chat_id), Some(char_name)) = (self.chat.chat_id(), self.chat.character_name())
        else {
            debug!("no active character/chat, skipping");
            return ExtractionOutcome::Skipped(SkipReason::NoActiveChat);
        };
        if self.chat.is_streaming() {
            debug!("generation stream in progress, skipping");
            return ExtractionOutcome::Skipped(SkipReason::StreamingInProgress);
        }

        let turns = self.chat.turns();
        let mut cursor = match self.cursors.load(&chat_id).await {
            Ok(cursor) => cursor.unwrap_or_default(),
            Err(err) => {
                error!(error = %err, "failed to load extraction cursor");
                return ExtractionOutcome::Failed {
                    message: GENERIC_FAILURE.to_string(),
                    partial: ExtractionReport::empty(run_id),
                };
            }
        };

        let chunk_size = settings.effective_chunk_size();
        let Some((start, end_exclusive)) =
            unprocessed_span(cursor.last_extracted_index, turns.len(), options.end_index)
        else {
            return ExtractionOutcome::Skipped(SkipReason::NothingToExtract {
                forced: options.force,
            });
        };
        let total_chunks = chunk_count(end_exclusive - start, chunk_size);

        // Forced long runs need the host's confirmation once; batch and
        // other headless callers pre-confirm.
        if options.force
            && total_chunks > settings.multi_chunk_confirm_threshold as usize
            && !options.confirm_large_run
        {
            return ExtractionOutcome::Skipped(SkipReason::ConfirmationRequired {
                chunks: total_chunks,
            });
        }

        self.note_run_started();
        info!(
            chat = %chat_id,
            unprocessed = end_exclusive - start,
            total_chunks,
            "starting extraction"
        );

        let char_card = self.chat.character_card();
        let run = ChunkRun {
            settings,
            turns: &turns,
            source_id: &chat_id,
            char_name: &char_name,
            char_card: &char_card,
            end_index: options.end_index,
            total_chunks,
            live: true,
        };
        let mut stats = RunStats::new();
        stats.last_index = cursor.last_extracted_index;
        let end = self.run_chunks(&run, &mut cursor, options, &mut stats).await;
        stats.chats = 1;

        let auto_consolidated = self
            .finish_run(settings, &run, &mut cursor, &end, &stats)
            .await;
        self.summarize(run_id, stats, end, auto_consolidated)
    }

    async fn extract_batch(
        &self,
        settings: &MemorySettings,
        options: &ExtractOptions,
    ) -> ExtractionOutcome {
        let run_id = Uuid::now_v7();
        self.note_run_started();

        let batch = match self.cursors.load_batch().await {
            Ok(batch) => batch,
            Err(err) => {
                error!(error = %err, "failed to load batch cursors");
                return ExtractionOutcome::Failed {
                    message: GENERIC_FAILURE.to_string(),
                    partial: ExtractionReport::empty(run_id),
                };
            }
        };
        let char_name = self
            .chat
            .character_name()
            .unwrap_or_else(|| "Character".to_string());
        let char_card = self.chat.character_card();
        let chunk_size = settings.effective_chunk_size();

        let mut stats = RunStats::new();
        let mut cancelled = false;
        for chat in &options.chats {
            // Suspension point between batch chats.
            if options.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let last = batch.get(&chat.id).copied().unwrap_or(-1);
            let Some((start, end_exclusive)) = unprocessed_span(last, chat.turns.len(), None)
            else {
                debug!(chat = %chat.id, "batch chat has nothing unprocessed");
                continue;
            };
            let run = ChunkRun {
                settings,
                turns: &chat.turns,
                source_id: &chat.id,
                char_name: &char_name,
                char_card: &char_card,
                end_index: None,
                total_chunks: chunk_count(end_exclusive - start, chunk_size),
                live: false,
            };
            let mut cursor = ExtractionCursor {
                last_extracted_index: last,
                messages_since_extraction: 0,
            };

            let end = self.run_chunks(&run, &mut cursor, options, &mut stats).await;
            stats.chats += 1;
            match end {
                LoopEnd::Completed | LoopEnd::EmptyChunk => {}
                LoopEnd::Cancelled => {
                    cancelled = true;
                    break;
                }
                other => return self.summarize(run_id, stats, other, false),
            }
        }

        let end = if cancelled {
            LoopEnd::Cancelled
        } else {
            LoopEnd::Completed
        };
        self.summarize(run_id, stats, end, false)
    }

    /// The strictly sequential chunk loop.
    async fn run_chunks(
        &self,
        run: &ChunkRun<'_>,
        cursor: &mut ExtractionCursor,
        options: &ExtractOptions,
        stats: &mut RunStats,
    ) -> LoopEnd {
        let chunk_size = run.settings.effective_chunk_size();

        for chunk_idx in 0..run.total_chunks {
            // Suspension point between chunks; an in-flight call is never
            // interrupted.
            if options.cancel.is_cancelled() {
                info!(chunks = stats.chunks, "extraction cancelled between chunks");
                return LoopEnd::Cancelled;
            }

            // Re-slice from the current cursor, not the original.
            let Some(slice) = select_window(
                run.turns,
                cursor.last_extracted_index,
                chunk_size,
                run.end_index,
            ) else {
                break;
            };
            if slice.formatted_count == 0 {
                // Conservative: an all-filtered chunk stops the run
                // instead of advancing blind.
                warn!(
                    chunk = chunk_idx + 1,
                    end_index = slice.end_index,
                    "chunk produced no extractable text, stopping run"
                );
                return LoopEnd::EmptyChunk;
            }

            let existing = match self.existing_memories_text().await {
                Ok(existing) => existing,
                Err(err) => {
                    error!(error = %err, "failed to read memory store");
                    return LoopEnd::Failed(err.to_string());
                }
            };
            let prompt = build_extraction_prompt(
                &run.settings.extraction_prompt,
                run.char_name,
                run.char_card,
                &existing,
                &slice.text,
                self.backend.capabilities(),
                &self.templater,
            );
            let messages = [
                Message::system(EXTRACTION_SYSTEM_PROMPT),
                Message::user(prompt),
            ];
            let raw = match self
                .backend
                .generate(&messages, run.settings.response_tokens)
                .await
            {
                Ok(raw) => raw,
                Err(err) if err.is_unavailable() => {
                    warn!(backend = self.backend.name(), error = %err, "backend unavailable");
                    return LoopEnd::BackendUnavailable(err.to_string());
                }
                Err(err) => {
                    error!(error = %err, "generation call failed");
                    return LoopEnd::Failed(err.to_string());
                }
            };

            let clean = strip_reasoning(&raw);
            let mut added = 0u32;
            if clean.is_empty() || clean == NO_NEW_MEMORIES {
                // A no-result chunk is not a failure: the cursor still
                // advances so the chunk is never retried.
                debug!(chunk = chunk_idx + 1, "chunk yielded no new memories");
            } else {
                let bodies =
                    parse_response_entries(&clean, self.storage.requires_tagged_response());
                if bodies.is_empty() {
                    warn!(
                        chunk = chunk_idx + 1,
                        "response contained no memory tags, saving nothing for this chunk"
                    );
                }
                let date = current_timestamp();
                let entries: Vec<MemoryEntry> = bodies
                    .iter()
                    .filter_map(|body| {
                        self.storage.entry_from_response(run.source_id, &date, body)
                    })
                    .collect();
                if !entries.is_empty() {
                    // Persist immediately: a crash loses at most the
                    // in-flight chunk.
                    if let Err(err) = self.storage.append(&entries).await {
                        error!(error = %err, "failed to persist extracted memories");
                        return LoopEnd::Failed(err.to_string());
                    }
                    added = entries.iter().map(|e| e.bullets.len() as u32).sum();
                }
            }

            // Advance to the chunk's actual last processed index and
            // persist after every chunk so interrupted runs resume.
            cursor.last_extracted_index = slice.end_index as i64;
            if let Err(err) = self.persist_cursor(run, cursor).await {
                error!(error = %err, "failed to persist cursor");
                return LoopEnd::Failed(err.to_string());
            }

            stats.chunks += 1;
            stats.memories += added;
            stats.last_index = cursor.last_extracted_index;
            debug!(
                chunk = chunk_idx + 1,
                total = run.total_chunks,
                added,
                "chunk committed"
            );
            if let Some(progress) = &options.progress {
                progress(ProgressEvent {
                    chat_id: run.source_id.to_string(),
                    chunk: chunk_idx + 1,
                    total_chunks: run.total_chunks,
                    memories_added: stats.memories,
                });
            }
        }

        LoopEnd::Completed
    }

    /// Post-loop work for live runs: cross-chunk merge, the automatic
    /// consolidation pass, and the message counter reset.
    async fn finish_run(
        &self,
        settings: &MemorySettings,
        run: &ChunkRun<'_>,
        cursor: &mut ExtractionCursor,
        end: &LoopEnd,
        stats: &RunStats,
    ) -> bool {
        // Merge same-source blocks accumulated across chunks. Best-effort:
        // committed memories are never rolled back over a merge failure.
        if stats.chunks > 1 && stats.memories > 0 && self.storage.supports_consolidation() {
            if let Err(err) = self.merge_store().await {
                warn!(error = %err, "post-run merge failed, keeping unmerged blocks");
            }
        }

        let mut auto_consolidated = false;
        if matches!(end, LoopEnd::Completed)
            && stats.chunks > 1
            && self.storage.supports_consolidation()
        {
            auto_consolidated = self
                .auto_consolidate(settings, run.source_id)
                .await
                .unwrap_or_else(|err| {
                    // Non-fatal: the extraction itself already committed.
                    warn!(error = %err, "automatic consolidation failed");
                    false
                });
        }

        // Reset the automatic-trigger counter for the live chat.
        if matches!(end, LoopEnd::Completed | LoopEnd::Cancelled | LoopEnd::EmptyChunk) {
            cursor.messages_since_extraction = 0;
            if let Err(err) = self.persist_cursor(run, cursor).await {
                warn!(error = %err, "failed to reset message counter");
            }
        }

        auto_consolidated
    }

    /// Coalesce same-source blocks in the persisted store.
    async fn merge_store(&self) -> Result<(), StoreError> {
        let blocks: Vec<MemoryBlock> = self
            .storage
            .load()
            .await?
            .into_iter()
            .map(MemoryBlock::from)
            .collect();
        let merged = merge_blocks(blocks.clone());
        if merged.len() == blocks.len() {
            return Ok(());
        }
        let entries: Vec<MemoryEntry> = merged.into_iter().map(MemoryEntry::from).collect();
        self.storage.replace_all(&entries).await
    }

    /// Map the loop end state onto the outcome, emitting one summary.
    fn summarize(
        &self,
        run_id: Uuid,
        stats: RunStats,
        end: LoopEnd,
        auto_consolidated: bool,
    ) -> ExtractionOutcome {
        let report = stats.into_report(run_id, auto_consolidated);
        match end {
            LoopEnd::Completed | LoopEnd::EmptyChunk => {
                info!(
                    memories = report.total_memories,
                    chunks = report.chunks_processed,
                    auto_consolidated = report.auto_consolidated,
                    "extraction completed"
                );
                ExtractionOutcome::Completed(report)
            }
            LoopEnd::Cancelled => {
                info!(
                    memories = report.total_memories,
                    chunks = report.chunks_processed,
                    "extraction aborted, partial progress retained"
                );
                ExtractionOutcome::Aborted(report)
            }
            LoopEnd::BackendUnavailable(message) => ExtractionOutcome::Failed {
                message,
                partial: report,
            },
            LoopEnd::Failed(detail) => {
                error!(detail = %detail, "extraction failed");
                ExtractionOutcome::Failed {
                    message: GENERIC_FAILURE.to_string(),
                    partial: report,
                }
            }
        }
    }

    // --- Automatic trigger support ---

    /// Record a rendered character message; returns true when the
    /// interval is reached and the host should invoke an automatic
    /// extraction.
    pub async fn note_character_message(&self) -> Result<bool, StoreError> {
        let settings = self.settings();
        let Some(chat_id) = self.chat.chat_id() else {
            return Ok(false);
        };
        let mut cursor = self.cursors.load(&chat_id).await?.unwrap_or_default();
        cursor.messages_since_extraction += 1;
        self.cursors.save(&chat_id, &cursor).await?;
        Ok(settings.enabled && cursor.messages_since_extraction >= settings.interval)
    }

    /// Handle a chat switch: auto-correct a stale cursor and seed the
    /// message counter with the unextracted backlog so automatic
    /// extraction re-arms.
    pub async fn note_chat_opened(&self) -> Result<(), StoreError> {
        let Some(chat_id) = self.chat.chat_id() else {
            return Ok(());
        };
        let message_count = self.chat.turns().len();
        let mut cursor = self.cursors.load(&chat_id).await?.unwrap_or_default();
        let mut dirty = false;

        // Stale cursor: it points past the chat, yet no persisted block
        // references this conversation. A previous run advanced it
        // without saving anything; start over.
        if cursor.last_extracted_index >= message_count as i64
            && !self.store_references(&chat_id).await?
        {
            warn!(
                chat = %chat_id,
                last_extracted_index = cursor.last_extracted_index,
                message_count,
                "stale extraction cursor detected, resetting"
            );
            cursor.reset();
            dirty = true;
        }

        let unextracted = cursor.unextracted(message_count) as u32;
        if unextracted > 0 && cursor.messages_since_extraction < unextracted {
            cursor.messages_since_extraction = unextracted;
            dirty = true;
        }

        if dirty {
            self.cursors.save(&chat_id, &cursor).await?;
        }
        Ok(())
    }

    async fn store_references(&self, source_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .storage
            .load()
            .await?
            .iter()
            .any(|entry| entry.source_id == source_id))
    }

    // --- Maintenance operations ---

    /// The live chat's cursor (pristine default when never created).
    pub async fn cursor(&self) -> Result<ExtractionCursor, StoreError> {
        let Some(chat_id) = self.chat.chat_id() else {
            return Ok(ExtractionCursor::default());
        };
        Ok(self.cursors.load(&chat_id).await?.unwrap_or_default())
    }

    #[cfg(test)]
    pub(crate) fn cursor_store(&self) -> &C {
        &self.cursors
    }

    /// Reset the live chat's cursor so the next extraction re-reads
    /// everything.
    pub async fn reset_cursor(&self) -> Result<(), StoreError> {
        let Some(chat_id) = self.chat.chat_id() else {
            return Ok(());
        };
        self.cursors
            .save(&chat_id, &ExtractionCursor::default())
            .await
    }

    /// Delete all memories and reset the cursor.
    pub async fn clear_store(&self) -> Result<(), StoreError> {
        self.storage.clear().await?;
        self.reset_cursor().await
    }

    /// Manually pin text as a memory block for the live chat. Lines become
    /// bullets (a leading `- ` is tolerated); HTML tags are stripped.
    /// Returns the number of bullets pinned.
    pub async fn pin_memory(&self, text: &str) -> Result<usize, StoreError> {
        let plain = strip_html_tags(text);
        let bullets: Vec<String> = plain
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| line.strip_prefix("- ").unwrap_or(line).trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();
        if bullets.is_empty() {
            return Ok(0);
        }

        let source_id = self
            .chat
            .chat_id()
            .unwrap_or_else(|| keepsake_types::memory::SOURCE_UNKNOWN.to_string());
        let count = bullets.len();
        let entry = MemoryEntry::new(source_id, current_timestamp(), bullets);
        self.storage.append(std::slice::from_ref(&entry)).await?;
        info!(bullets = count, "pinned memory");
        Ok(count)
    }

    /// All persisted blocks, in store order.
    pub async fn blocks(&self) -> Result<Vec<MemoryBlock>, StoreError> {
        Ok(self
            .storage
            .load()
            .await?
            .into_iter()
            .map(MemoryBlock::from)
            .collect())
    }

    /// Total persisted bullets.
    pub async fn memory_count(&self) -> Result<usize, StoreError> {
        Ok(count_bullets(&self.blocks().await?))
    }

    /// Delete one block (or one file in the per-entry schema).
    pub async fn delete_block(&self, index: usize) -> Result<(), StoreError> {
        self.storage.delete_entry(index).await
    }

    /// Delete one bullet, pruning its block when it was the last.
    pub async fn delete_bullet(&self, block: usize, bullet: usize) -> Result<(), StoreError> {
        self.storage.delete_bullet(block, bullet).await
    }

    /// Replace one bullet's text (empty text deletes it).
    pub async fn edit_bullet(
        &self,
        block: usize,
        bullet: usize,
        text: &str,
    ) -> Result<(), StoreError> {
        self.storage.edit_bullet(block, bullet, text).await
    }
}
