//! Codec error types.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, Error)]
pub enum CodecError {
    /// IO error during read/write operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame too large.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge {
        /// Actual frame size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Frame shorter than its own header.
    #[error("truncated frame: need {needed} more bytes")]
    Truncated {
        /// Bytes missing to complete the structure being read.
        needed: usize,
    },

    /// Invalid frame magic.
    #[error("invalid frame magic: {0:#06x}")]
    InvalidMagic(u16),

    /// Encoding error.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Decoding error.
    #[error("decoding error: {0}")]
    Decoding(String),
}

/// Errors surfaced by [`Channel`](crate::Channel) calls.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Framing or I/O failure.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// No response arrived within the channel timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The peer closed the stream.
    #[error("channel closed by peer")]
    Closed,
}
