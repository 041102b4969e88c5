//! Mock server errors.

use thiserror::Error;

/// Errors starting the mock server.
#[derive(Debug, Error)]
pub enum MockError {
    /// The listener could not be bound.
    #[error("failed to bind mock server: {0}")]
    Bind(#[source] std::io::Error),

    /// The server runtime or thread could not be started.
    #[error("failed to start mock server runtime: {0}")]
    Runtime(#[source] std::io::Error),
}
