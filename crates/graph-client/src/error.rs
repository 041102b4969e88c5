//! Error types for the client crate.

use graph_codec::ChannelError;
use graph_protocol::ErrorCode;
use graph_tls::TransportError;
use thiserror::Error;

use crate::event_loop::LoopError;

/// Errors parsing a `host:port` address.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// The host part was empty.
    #[error("empty host in address '{0}'")]
    EmptyHost(String),

    /// No port was given.
    #[error("missing port in address '{0}'")]
    MissingPort(String),

    /// The port was not a valid u16.
    #[error("invalid port in address '{0}'")]
    InvalidPort(String),
}

/// Errors establishing a connection.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The address was empty.
    #[error("empty address")]
    EmptyAddress,

    /// Name resolution failed.
    #[error("failed to resolve {addr}: {source}")]
    Resolve {
        /// Address being resolved.
        addr: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// TCP connect or TLS handshake failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The event loop could not run the connect.
    #[error(transparent)]
    EventLoop(#[from] LoopError),

    /// The server refused the version handshake.
    #[error("version handshake failed ({code}): {message}")]
    Handshake {
        /// Code returned by the handshake.
        code: ErrorCode,
        /// Message returned by the handshake.
        message: String,
    },
}

/// Errors raised by an RPC call.
///
/// These are converted into responses at the [`Connection`](crate::Connection)
/// boundary; [`GraphClient`](crate::GraphClient) implementations produce them.
#[derive(Debug, Error)]
pub enum RpcError {
    /// No link is open.
    #[error("not connected")]
    NotConnected,

    /// The channel failed (I/O, framing, timeout, peer closed).
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// The request could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),

    /// The response could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The server reported a protocol-level failure.
    #[error("remote error: {0}")]
    Remote(String),

    /// The connection was closed while the request was pending.
    #[error("connection closed while request was pending")]
    Cancelled,

    /// The event loop could not run the request.
    #[error(transparent)]
    EventLoop(#[from] LoopError),
}

impl RpcError {
    /// Error code reported for this failure.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotConnected => ErrorCode::Disconnected,
            _ => ErrorCode::RpcFailure,
        }
    }
}

/// Errors surfaced by the `try_*` request variants.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No link is open.
    #[error("not connected")]
    Disconnected,

    /// The RPC failed.
    #[error(transparent)]
    Rpc(RpcError),
}

impl From<RpcError> for ClientError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::NotConnected => Self::Disconnected,
            other => Self::Rpc(other),
        }
    }
}

impl ClientError {
    /// Error code reported for this failure.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Disconnected => ErrorCode::Disconnected,
            Self::Rpc(e) => e.error_code(),
        }
    }
}
