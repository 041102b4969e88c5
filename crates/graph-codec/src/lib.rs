//! # graph-codec
//!
//! Framing layer between a raw byte stream and the RPC client.
//!
//! Every message travels as one frame: a length prefix, a small fixed header
//! (magic, flags, sequence number), a list of string key/value headers and an
//! opaque payload. The payload encoding belongs to the RPC client; this crate
//! only guarantees frame boundaries and request/response pairing.
//!
//! ## Features
//!
//! - Frame reassembly across TCP segment boundaries
//! - Frame size limit enforced before buffering
//! - Sequence-matched request/response calls with a per-request timeout
//! - Integration with tokio-util's codec framework

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod channel;
pub mod error;
pub mod frame;
pub mod framed;

pub use channel::Channel;
pub use error::{ChannelError, CodecError};
pub use frame::{Frame, FrameHeader, HeaderCodec};
pub use framed::FrameStream;
