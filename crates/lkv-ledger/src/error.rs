use std::io;

/// Errors produced by ledger backends.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Keys must be non-empty strings.
    #[error("ledger keys must not be empty")]
    EmptyKey,

    /// I/O error from a file-backed ledger.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A log record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A log record exceeds the maximum frame size.
    #[error("record too large: {size} bytes (max {max})")]
    RecordTooLarge { size: usize, max: usize },

    /// The backend cannot serve requests (e.g. a poisoned lock).
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
