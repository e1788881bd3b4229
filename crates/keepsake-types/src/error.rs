use thiserror::Error;

/// Errors from memory storage operations (used by trait definitions in
/// keepsake-core; implementations live in keepsake-infra or the host).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("attachment not found: '{0}'")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("malformed content: {0}")]
    Malformed(String),

    #[error("operation not supported by this storage strategy: {0}")]
    Unsupported(&'static str),

    #[error("index out of range")]
    IndexOutOfRange,
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}
