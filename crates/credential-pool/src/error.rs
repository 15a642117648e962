//! Error types for pool operations

/// Errors from pool operations.
///
/// `VendorUnknown` and `PoolExhausted` are ordinary outcomes that callers
/// surface as "not found"; only `StoreUnavailable` means the operation did
/// not happen because the backing store failed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("vendor unknown: {0}")]
    VendorUnknown(String),

    #[error("pool exhausted: {0}")]
    PoolExhausted(String),

    #[error("credential not found for vendor: {0}")]
    CredentialNotFound(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("malformed row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[error("invalid layout: {0}")]
    InvalidLayout(String),
}

impl Error {
    /// True for the outcomes a caller reports as "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::VendorUnknown(_) | Error::PoolExhausted(_)
        )
    }

    /// Short label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Error::VendorUnknown(_) => "vendor_unknown",
            Error::PoolExhausted(_) => "exhausted",
            Error::CredentialNotFound(_) => "credential_not_found",
            Error::StoreUnavailable(_) => "store_unavailable",
            Error::MalformedRow { .. } => "malformed_row",
            Error::InvalidLayout(_) => "invalid_layout",
        }
    }
}

/// Result alias for pool operations.
pub type Result<T> = std::result::Result<T, Error>;
