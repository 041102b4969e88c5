//! TLS and transport error types.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while building a TLS client context.
#[derive(Debug, Error)]
pub enum TlsError {
    /// The CA bundle could not be read.
    #[error("failed to read CA bundle {path}: {source}")]
    Io {
        /// Path of the bundle.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The CA bundle contained no usable certificate.
    #[error("no certificates found in CA bundle {0}")]
    NoCertificates(String),

    /// rustls rejected the configuration or a certificate.
    #[error("TLS configuration error: {0}")]
    Rustls(#[from] rustls::Error),

    /// The host cannot be used as a TLS server name.
    #[error("invalid TLS server name: {0}")]
    InvalidServerName(String),
}

/// Errors raised while establishing a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// TCP connect failed.
    #[error("connect failed: {0}")]
    Io(#[from] std::io::Error),

    /// Connect (including TLS handshake) did not finish in time.
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),

    /// The TLS context could not be built.
    #[error(transparent)]
    Tls(#[from] TlsError),

    /// The TLS handshake failed.
    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] std::io::Error),
}
