use serde::{Deserialize, Serialize};
use thiserror::Error;

use lkv_ledger::LedgerError;

use crate::operation::{OperationName, Path};

/// A ledger access failed. Carries the backend error as detail.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Every failure an operation can produce.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Wrong argument count or an empty required argument.
    #[error("invalid arguments for {operation}: {reason}")]
    InvalidArguments {
        operation: OperationName,
        reason: String,
    },

    /// The name is not an operation on this path.
    #[error("unknown {path} operation: {name}")]
    UnknownOperation { path: Path, name: String },

    #[error("user already exists: {username}")]
    UserAlreadyExists { username: String },

    #[error("user not found: {username}")]
    UserNotFound { username: String },

    /// The username is kept for callers; the message deliberately omits it.
    #[error("invalid credentials")]
    InvalidCredentials { username: String },

    /// Bytes stored under a user key do not decode as a user record.
    #[error("corrupt user record at {key}: {reason}")]
    CorruptRecord { key: String, reason: String },

    /// Raw read of an absent key, or the ledger failed during the read.
    #[error("failed to read state for {key}{}", detail_suffix(.detail))]
    ReadFailed { key: String, detail: Option<String> },

    #[error("store error: {0}")]
    Store(#[from] StateError),

    /// Password hashing or verification could not run.
    #[error("credential error: {0}")]
    Credential(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl CoreError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArguments { .. } => ErrorCode::InvalidArguments,
            Self::UnknownOperation { .. } => ErrorCode::UnknownOperation,
            Self::UserAlreadyExists { .. } => ErrorCode::UserAlreadyExists,
            Self::UserNotFound { .. } => ErrorCode::UserNotFound,
            Self::InvalidCredentials { .. } => ErrorCode::InvalidCredentials,
            Self::CorruptRecord { .. } => ErrorCode::CorruptRecord,
            Self::ReadFailed { .. } => ErrorCode::ReadFailed,
            Self::Store(_) => ErrorCode::StoreError,
            Self::Credential(_) | Self::Config(_) => ErrorCode::Internal,
        }
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}

/// Wire-level error codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidArguments,
    UnknownOperation,
    UserAlreadyExists,
    UserNotFound,
    InvalidCredentials,
    CorruptRecord,
    ReadFailed,
    StoreError,
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArguments => "INVALID_ARGUMENTS",
            Self::UnknownOperation => "UNKNOWN_OPERATION",
            Self::UserAlreadyExists => "USER_ALREADY_EXISTS",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::CorruptRecord => "CORRUPT_RECORD",
            Self::ReadFailed => "READ_FAILED",
            Self::StoreError => "STORE_ERROR",
            Self::Internal => "INTERNAL",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
