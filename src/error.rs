//! Error types for picount.

use thiserror::Error;

/// Errors that can occur when invoking a partial-sum kernel.
#[derive(Debug, Error)]
pub enum Error {
    /// An argument is outside the supported numeric range.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// Arguments are inconsistent with each other.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for kernel invocations.
pub type Result<T> = std::result::Result<T, Error>;
