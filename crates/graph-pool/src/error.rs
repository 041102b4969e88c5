//! Pool error types.

use thiserror::Error;

/// Errors from pool setup and management.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// `init` was already called successfully.
    #[error("pool is already initialized")]
    AlreadyInitialized,

    /// No address produced a working connection.
    #[error("no address is available")]
    NoAvailableAddress,

    /// The idle checker thread could not be started.
    #[error("failed to start idle checker: {0}")]
    Spawn(#[source] std::io::Error),
}
