//! Log error types.
//!
//! All errors are explicit and typed. No string errors.

use thiserror::Error;

/// Result type for log operations.
pub type LogResult<T> = Result<T, LogError>;

/// Errors that can occur during log operations.
#[derive(Debug, Clone, Error)]
pub enum LogError {
    /// Requested term length is not usable.
    #[error("invalid term length {requested}: {reason}")]
    InvalidTermLength {
        /// The requested term length in bytes.
        requested: i64,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Claimed payload length cannot be framed within a term.
    #[error("invalid frame length: payload {length} bytes exceeds max {max} bytes")]
    InvalidFrameLength {
        /// Requested payload length.
        length: i64,
        /// Maximum payload length for this term length.
        max: i32,
    },

    /// I/O error from file creation or mapping.
    #[error("I/O error: {operation}: {message}")]
    Io {
        /// What operation was being performed.
        operation: &'static str,
        /// Error message.
        message: String,
    },

    /// A claim would exceed the term even after padding.
    ///
    /// Rotation consumes this internally; it does not surface through
    /// [`AppendLog::claim`](crate::AppendLog::claim) in normal use.
    #[error("log full: term {term_id} cannot fit {length} more bytes")]
    LogFull {
        /// The term that tripped.
        term_id: i32,
        /// The aligned frame length that did not fit.
        length: i32,
    },
}

impl LogError {
    /// Creates an I/O error.
    pub fn io(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Io {
            operation,
            message: err.to_string(),
        }
    }
}
