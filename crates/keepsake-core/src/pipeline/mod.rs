//! The extraction orchestrator and consolidation engine.
//!
//! `MemoryPipeline` is the stateful entry point: it owns the single-flight
//! guard, the cooldown timer, and the consolidation undo backup, and it
//! drives the chunk loop over the collaborator ports.

pub mod consolidate;
pub mod orchestrator;
pub mod outcome;

pub use consolidate::{ConsolidationOutcome, ConsolidationPreview, ConsolidationSkip};
pub use orchestrator::MemoryPipeline;
pub use outcome::{
    ExtractOptions, ExtractionOutcome, ExtractionReport, ProgressEvent, ProgressFn, SkipReason,
};
