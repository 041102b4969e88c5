//! Request/response channel over a frame stream.

use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::ChannelError;
use crate::frame::{FLAG_ONEWAY, Frame, HeaderCodec};
use crate::framed::FrameStream;

/// A header-carrying request/response channel.
///
/// One request is in flight at a time: [`call`](Channel::call) takes
/// `&mut self`. Each request gets a fresh sequence number and the channel
/// waits for the response carrying the same number, discarding late replies
/// to earlier requests that timed out.
pub struct Channel<T> {
    stream: FrameStream<T>,
    next_sequence: u32,
    timeout: Option<Duration>,
    headers: Vec<(String, String)>,
}

impl<T> Channel<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a channel without timeout.
    pub fn new(transport: T) -> Self {
        Self::with_codec(transport, HeaderCodec::new())
    }

    /// Create a channel with a custom codec.
    pub fn with_codec(transport: T, codec: HeaderCodec) -> Self {
        Self {
            stream: FrameStream::with_codec(transport, codec),
            next_sequence: 1,
            timeout: None,
            headers: Vec::new(),
        }
    }

    /// Set the per-request timeout. `None` or zero disables it.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout.filter(|t| !t.is_zero());
    }

    /// Get the per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Attach a header to every subsequent request, replacing any previous
    /// value for the key.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.headers.push((key, value)),
        }
    }

    /// Get the persistent request headers.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    fn next_frame(&mut self, payload: Bytes) -> Frame {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        Frame::new(sequence, payload).with_headers(self.headers.clone())
    }

    /// Send a request and wait for its response payload.
    pub async fn call(&mut self, payload: Bytes) -> Result<Bytes, ChannelError> {
        let frame = self.next_frame(payload);
        let sequence = frame.header.sequence;
        let timeout = self.timeout;
        let stream = &mut self.stream;

        let exchange = async move {
            stream.send(frame).await?;
            loop {
                match stream.next().await {
                    None => return Err(ChannelError::Closed),
                    Some(Err(e)) => return Err(e.into()),
                    Some(Ok(reply)) if reply.header.sequence == sequence => {
                        return Ok(reply.payload);
                    }
                    Some(Ok(reply)) => {
                        tracing::debug!(
                            expected = sequence,
                            received = reply.header.sequence,
                            "discarding stale response"
                        );
                    }
                }
            }
        };

        match timeout {
            None => exchange.await,
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| ChannelError::Timeout(limit))?,
        }
    }

    /// Send a request that expects no response.
    pub async fn send_oneway(&mut self, payload: Bytes) -> Result<(), ChannelError> {
        let frame = self.next_frame(payload).with_flags(FLAG_ONEWAY);
        self.stream.send(frame).await?;
        Ok(())
    }

    /// Flush pending writes and shut the transport down.
    pub async fn close(&mut self) -> Result<(), ChannelError> {
        self.stream.close().await?;
        Ok(())
    }
}

impl<T> std::fmt::Debug for Channel<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("stream", &self.stream)
            .field("next_sequence", &self.next_sequence)
            .field("timeout", &self.timeout)
            .finish()
    }
}
