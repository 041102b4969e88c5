//! Protocol-level error types.

use thiserror::Error;

/// Errors that can occur while interpreting protocol values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A row did not have the same width as the dataset header.
    #[error("row width mismatch: expected {expected} columns, got {actual}")]
    RowWidth {
        /// Number of columns in the dataset.
        expected: usize,
        /// Number of values in the offending row.
        actual: usize,
    },

    /// A response violated the "message iff failure" invariant.
    #[error("inconsistent response: code {code} with message present = {has_message}")]
    InconsistentResponse {
        /// Raw error code carried by the response.
        code: i32,
        /// Whether an error message was attached.
        has_message: bool,
    },

    /// A value had a different type than requested.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Requested type name.
        expected: &'static str,
        /// Actual type name.
        found: &'static str,
    },
}
