//! Options and result shapes for the extraction orchestrator.
//!
//! `extract()` never raises: preconditions fold into [`SkipReason`] and
//! runtime failures into [`ExtractionOutcome::Failed`], always carrying
//! whatever partial progress was already committed (extraction is
//! chunk-atomic, not operation-atomic).

use std::fmt;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use keepsake_types::chat::BatchChat;

/// Progress callback invoked after every committed chunk.
pub type ProgressFn = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Inputs to one `extract()` invocation.
pub struct ExtractOptions {
    /// Bypass the enabled flag, the cooldown gate, and the interval check.
    pub force: bool,
    /// Inclusive upper bound on the message window (defaults to the last
    /// message).
    pub end_index: Option<usize>,
    /// Background-fetched chat histories to process instead of the live
    /// chat. Batch runs are headless: no confirmation gate applies.
    pub chats: Vec<BatchChat>,
    /// Cooperative cancellation, polled between chunks and between chats.
    pub cancel: CancellationToken,
    /// Confirms a forced run spanning more than the confirmation
    /// threshold of chunks. Set by headless callers, or after the host
    /// showed its confirmation dialog in response to
    /// [`SkipReason::ConfirmationRequired`].
    pub confirm_large_run: bool,
    /// Invoked after every committed chunk.
    pub progress: Option<ProgressFn>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            force: false,
            end_index: None,
            chats: Vec::new(),
            cancel: CancellationToken::new(),
            confirm_large_run: false,
            progress: None,
        }
    }
}

impl ExtractOptions {
    /// A forced manual run with default bounds.
    pub fn forced() -> Self {
        Self {
            force: true,
            ..Default::default()
        }
    }
}

/// Chunk-level progress notification.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    /// Chat being processed (the live chat id, or a batch chat id).
    pub chat_id: String,
    /// 1-based chunk number within this chat.
    pub chunk: usize,
    /// Chunks planned for this chat.
    pub total_chunks: usize,
    /// Bullets committed so far across the whole run.
    pub memories_added: u32,
}

/// Summary of one extraction run.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub run_id: Uuid,
    /// Bullets committed by this run.
    pub total_memories: u32,
    pub chunks_processed: u32,
    /// Cursor position after the run (`-1` if nothing was processed).
    pub last_extracted_index: i64,
    /// Whether the post-run automatic consolidation pass committed.
    pub auto_consolidated: bool,
    /// Chats covered (1 for live runs).
    pub chats_processed: u32,
}

impl ExtractionReport {
    pub(crate) fn empty(run_id: Uuid) -> Self {
        Self {
            run_id,
            total_memories: 0,
            chunks_processed: 0,
            last_extracted_index: -1,
            auto_consolidated: false,
            chats_processed: 0,
        }
    }
}

/// Why an extraction request was dropped before doing any work.
///
/// Guard skips are never errors; most deserve at most a light notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// Another extraction or consolidation is in flight; the request is
    /// dropped, not queued.
    AlreadyRunning,
    /// Automatic extraction is disabled and the run was not forced.
    Disabled,
    /// No active character/chat to operate on.
    NoActiveChat,
    /// The host is still streaming a generation into the chat.
    StreamingInProgress,
    /// Zero unprocessed messages. `forced` distinguishes the user-facing
    /// notice for manual runs from the silent automatic case.
    NothingToExtract { forced: bool },
    /// The automatic cooldown window has not elapsed.
    CooldownActive { remaining_secs: u64 },
    /// A forced multi-chunk run needs confirmation; re-invoke with
    /// `confirm_large_run` once the user agrees.
    ConfirmationRequired { chunks: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyRunning => write!(f, "an extraction is already running"),
            SkipReason::Disabled => write!(f, "automatic extraction is disabled"),
            SkipReason::NoActiveChat => write!(f, "no active character or chat"),
            SkipReason::StreamingInProgress => write!(f, "a generation is still streaming"),
            SkipReason::NothingToExtract { forced: true } => {
                write!(f, "no new messages to extract")
            }
            SkipReason::NothingToExtract { forced: false } => {
                write!(f, "nothing unprocessed; skipping automatic extraction")
            }
            SkipReason::CooldownActive { remaining_secs } => {
                write!(f, "cooldown active, {remaining_secs}s remaining")
            }
            SkipReason::ConfirmationRequired { chunks } => {
                write!(f, "run spans {chunks} chunks and needs confirmation")
            }
        }
    }
}

/// Terminal state of one `extract()` invocation.
#[derive(Debug)]
pub enum ExtractionOutcome {
    /// A precondition short-circuited the run; nothing happened.
    Skipped(SkipReason),
    /// Every planned chunk ran.
    Completed(ExtractionReport),
    /// Cancelled between chunks; committed chunks are retained.
    Aborted(ExtractionReport),
    /// The operation failed; committed chunks are retained. `message` is
    /// user-facing (specific for backend-unavailable, generic otherwise --
    /// detail goes to the log).
    Failed {
        message: String,
        partial: ExtractionReport,
    },
}

impl ExtractionOutcome {
    /// The run report, when any chunk work was attempted.
    pub fn report(&self) -> Option<&ExtractionReport> {
        match self {
            ExtractionOutcome::Skipped(_) => None,
            ExtractionOutcome::Completed(report)
            | ExtractionOutcome::Aborted(report)
            | ExtractionOutcome::Failed { partial: report, .. } => Some(report),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ExtractionOutcome::Skipped(_))
    }
}
