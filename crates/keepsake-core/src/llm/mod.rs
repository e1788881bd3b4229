//! Generation backend abstraction.
//!
//! The pipeline's contract with a backend is deliberately small: one
//! retry-free call turning messages into raw text. Adapters own their
//! auth/header/URL quirks; runtime selection goes through the boxed
//! wrapper.

pub mod backend;
pub mod boxed;
pub mod reasoning;

pub use backend::GenerationBackend;
pub use boxed::BoxGenerationBackend;
pub use reasoning::strip_reasoning;
