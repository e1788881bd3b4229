//! Host chat access port.

pub mod source;

pub use source::ChatSource;
