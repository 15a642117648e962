//! Error types for store adapter operations

/// Errors from reading or writing the backing store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("store response parse error: {0}")]
    Parse(String),

    #[error("invalid cell address: {0}")]
    InvalidAddress(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
