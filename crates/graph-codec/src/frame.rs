//! Frame layout and the tokio-util codec.
//!
//! ```text
//! +--------+-------+-------+----------+--------+-----------------+---------+
//! | len u32| magic | flags | sequence | hcount | headers (k, v)* | payload |
//! |   BE   |  u16  |  u16  |   u32    |  u16   | u16-len strings |  bytes  |
//! +--------+-------+-------+----------+--------+-----------------+---------+
//! ```
//!
//! `len` counts every byte after itself.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::CodecError;

/// Magic number opening every frame.
pub const FRAME_MAGIC: u16 = 0x0FFF;

/// Flag marking a request that expects no response.
pub const FLAG_ONEWAY: u16 = 0x0001;

/// Size of the length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Size of the fixed header following the length prefix.
pub const FIXED_HEADER_SIZE: usize = 10;

/// Default maximum frame size (16 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Header of a frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameHeader {
    /// Flag bits, see [`FLAG_ONEWAY`].
    pub flags: u16,
    /// Sequence number pairing a response with its request.
    pub sequence: u32,
    /// Key/value headers.
    pub headers: Vec<(String, String)>,
}

impl FrameHeader {
    /// Look up a header value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the frame expects no response.
    #[must_use]
    pub fn is_oneway(&self) -> bool {
        self.flags & FLAG_ONEWAY != 0
    }
}

/// A complete frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame header.
    pub header: FrameHeader,
    /// Opaque payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame with the given sequence number and no headers.
    #[must_use]
    pub fn new(sequence: u32, payload: Bytes) -> Self {
        Self {
            header: FrameHeader {
                flags: 0,
                sequence,
                headers: Vec::new(),
            },
            payload,
        }
    }

    /// Replace the key/value headers.
    #[must_use]
    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.header.headers = headers;
        self
    }

    /// Set flag bits.
    #[must_use]
    pub fn with_flags(mut self, flags: u16) -> Self {
        self.header.flags |= flags;
        self
    }

    /// Build the response frame for this request.
    #[must_use]
    pub fn reply(&self, payload: Bytes) -> Self {
        Self::new(self.header.sequence, payload)
    }
}

/// Codec for [`Frame`]s.
#[derive(Debug, Clone)]
pub struct HeaderCodec {
    max_frame_size: usize,
}

impl HeaderCodec {
    /// Create a codec with the default size limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Set the maximum accepted frame size, excluding the length prefix.
    #[must_use]
    pub fn with_max_frame_size(mut self, max: usize) -> Self {
        self.max_frame_size = max;
        self
    }

    /// Get the maximum frame size.
    #[must_use]
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for HeaderCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn read_string(buf: &mut Bytes) -> Result<String, CodecError> {
    if buf.remaining() < 2 {
        return Err(CodecError::Truncated {
            needed: 2 - buf.remaining(),
        });
    }
    let len = usize::from(buf.get_u16());
    if buf.remaining() < len {
        return Err(CodecError::Truncated {
            needed: len - buf.remaining(),
        });
    }
    let raw = buf.split_to(len);
    String::from_utf8(raw.to_vec())
        .map_err(|e| CodecError::Decoding(format!("header is not UTF-8: {e}")))
}

fn write_string(dst: &mut BytesMut, value: &str) -> Result<(), CodecError> {
    let len = u16::try_from(value.len())
        .map_err(|_| CodecError::Encoding(format!("header too long: {} bytes", value.len())))?;
    dst.put_u16(len);
    dst.put_slice(value.as_bytes());
    Ok(())
}

impl Decoder for HeaderCodec {
    type Item = Frame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, CodecError> {
        if src.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }

        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        prefix.copy_from_slice(&src[..LENGTH_PREFIX_SIZE]);
        let len = u32::from_be_bytes(prefix) as usize;

        if len > self.max_frame_size {
            return Err(CodecError::FrameTooLarge {
                size: len,
                max: self.max_frame_size,
            });
        }
        if len < FIXED_HEADER_SIZE {
            return Err(CodecError::Truncated {
                needed: FIXED_HEADER_SIZE - len,
            });
        }
        if src.len() < LENGTH_PREFIX_SIZE + len {
            src.reserve(LENGTH_PREFIX_SIZE + len - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX_SIZE);
        let mut body = src.split_to(len).freeze();

        let magic = body.get_u16();
        if magic != FRAME_MAGIC {
            return Err(CodecError::InvalidMagic(magic));
        }
        let flags = body.get_u16();
        let sequence = body.get_u32();
        let count = body.get_u16();

        let mut headers = Vec::with_capacity(usize::from(count).min(64));
        for _ in 0..count {
            let key = read_string(&mut body)?;
            let value = read_string(&mut body)?;
            headers.push((key, value));
        }

        Ok(Some(Frame {
            header: FrameHeader {
                flags,
                sequence,
                headers,
            },
            payload: body,
        }))
    }
}

impl Encoder<Frame> for HeaderCodec {
    type Error = CodecError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), CodecError> {
        let count = u16::try_from(frame.header.headers.len()).map_err(|_| {
            CodecError::Encoding(format!(
                "too many headers: {}",
                frame.header.headers.len()
            ))
        })?;
        let headers_len: usize = frame
            .header
            .headers
            .iter()
            .map(|(k, v)| 4 + k.len() + v.len())
            .sum();
        let len = FIXED_HEADER_SIZE + headers_len + frame.payload.len();
        if len > self.max_frame_size {
            return Err(CodecError::FrameTooLarge {
                size: len,
                max: self.max_frame_size,
            });
        }
        let prefix = u32::try_from(len).map_err(|_| CodecError::FrameTooLarge {
            size: len,
            max: self.max_frame_size,
        })?;

        dst.reserve(LENGTH_PREFIX_SIZE + len);
        dst.put_u32(prefix);
        dst.put_u16(FRAME_MAGIC);
        dst.put_u16(frame.header.flags);
        dst.put_u32(frame.header.sequence);
        dst.put_u16(count);
        for (key, value) in &frame.header.headers {
            write_string(dst, key)?;
            write_string(dst, value)?;
        }
        dst.put_slice(&frame.payload);
        Ok(())
    }
}
