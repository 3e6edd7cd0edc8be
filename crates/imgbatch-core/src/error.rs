//! Error types module
//!
//! All failures of the pipeline are unified under [`AppError`]. Variants are split
//! into item-level failures (one image could not be decoded or encoded) and
//! batch-level failures (the remote call failed, the run was cancelled, or another
//! run is already in flight).

use std::io;

use crate::models::ItemId;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected conditions like filtered input
    Debug,
    /// Warning level - for recoverable per-item failures
    Warn,
    /// Error level - for failures that abort a whole batch
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to decode {name}: {reason}")]
    Decode { name: String, reason: String },

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("A batch is already in progress")]
    Busy,

    #[error("Batch was cancelled")]
    Cancelled,

    #[error("Item not found: {0}")]
    NotFound(ItemId),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn decode(name: impl Into<String>, reason: impl ToString) -> Self {
        AppError::Decode {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error invalidates the whole batch rather than a single item.
    pub fn is_batch_level(&self) -> bool {
        matches!(
            self,
            AppError::Transport(_)
                | AppError::MalformedResponse(_)
                | AppError::Busy
                | AppError::Cancelled
                | AppError::Internal(_)
        )
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            AppError::UnsupportedInput(_) | AppError::Busy | AppError::Cancelled => {
                LogLevel::Debug
            }
            AppError::Decode { .. }
            | AppError::Encode(_)
            | AppError::NotFound(_)
            | AppError::InvalidInput(_) => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedResponse(format!("JSON parsing error: {}", err))
    }
}

impl From<base64::DecodeError> for AppError {
    fn from(err: base64::DecodeError) -> Self {
        AppError::MalformedResponse(format!("Base64 decoding error: {}", err))
    }
}
