//! Framed stream for async I/O.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::{Sink, Stream};
use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;

use crate::error::CodecError;
use crate::frame::{Frame, HeaderCodec};

pin_project! {
    /// A stream of [`Frame`]s over an async I/O transport.
    ///
    /// This wraps a tokio-util `Framed` codec. Clients usually go through
    /// [`Channel`](crate::Channel); servers and tests use this directly.
    pub struct FrameStream<T> {
        #[pin]
        inner: Framed<T, HeaderCodec>,
    }
}

impl<T> FrameStream<T>
where
    T: AsyncRead + AsyncWrite,
{
    /// Create a new frame stream over the given transport.
    pub fn new(transport: T) -> Self {
        Self::with_codec(transport, HeaderCodec::new())
    }

    /// Create a new frame stream with a custom codec.
    pub fn with_codec(transport: T, codec: HeaderCodec) -> Self {
        Self {
            inner: Framed::new(transport, codec),
        }
    }

    /// Get a reference to the underlying transport.
    pub fn get_ref(&self) -> &T {
        self.inner.get_ref()
    }

    /// Largest frame body this stream accepts.
    pub fn max_frame_size(&self) -> usize {
        self.inner.codec().max_frame_size()
    }
}

impl<T> Stream for FrameStream<T>
where
    T: AsyncRead + Unpin,
{
    type Item = Result<Frame, CodecError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().inner.poll_next(cx)
    }
}

impl<T> Sink<Frame> for FrameStream<T>
where
    T: AsyncWrite + Unpin,
{
    type Error = CodecError;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_ready(cx)
    }

    fn start_send(self: Pin<&mut Self>, item: Frame) -> Result<(), Self::Error> {
        self.project().inner.start_send(item)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_flush(cx)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_close(cx)
    }
}

impl<T> std::fmt::Debug for FrameStream<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameStream")
            .field("transport", self.inner.get_ref())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures_util::{SinkExt, StreamExt};

    #[tokio::test]
    async fn test_frames_cross_a_duplex_pipe() {
        let (client, server) = tokio::io::duplex(1024);
        let mut client = FrameStream::new(client);
        let mut server = FrameStream::with_codec(server, HeaderCodec::new().with_max_frame_size(512));
        assert_eq!(server.max_frame_size(), 512);

        client
            .send(Frame::new(7, Bytes::from_static(b"ping")))
            .await
            .unwrap();
        let frame = server.next().await.unwrap().unwrap();
        assert_eq!(frame.header.sequence, 7);
        assert_eq!(&frame.payload[..], b"ping");

        server.send(frame.reply(Bytes::from_static(b"pong"))).await.unwrap();
        let reply = client.next().await.unwrap().unwrap();
        assert_eq!(reply.header.sequence, 7);
        assert_eq!(&reply.payload[..], b"pong");
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let (client, server) = tokio::io::duplex(4096);
        let mut client = FrameStream::new(client);
        let mut server = FrameStream::with_codec(server, HeaderCodec::new().with_max_frame_size(16));

        client
            .send(Frame::new(1, Bytes::from(vec![0u8; 64])))
            .await
            .unwrap();
        let err = server.next().await.unwrap().unwrap_err();
        assert!(matches!(err, CodecError::FrameTooLarge { max: 16, .. }));
    }
}
