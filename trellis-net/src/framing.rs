//! Message framing using tokio-util LengthDelimitedCodec
//!
//! Provides a clean interface for sending/receiving length-prefixed
//! Borsh-encoded [`PeerMessage`]s over any byte stream without manual
//! buffer management. Generic over the stream halves, so the same framing
//! works for a production transport and for in-memory duplex pairs.

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

use crate::error::NetError;
use crate::messages::PeerMessage;

/// Framed writer for sending [`PeerMessage`] over a send stream.
pub struct MessageSink<W> {
    inner: FramedWrite<W, LengthDelimitedCodec>,
}

impl<W: AsyncWrite + Unpin> MessageSink<W> {
    pub fn new(stream: W) -> Self {
        Self {
            inner: FramedWrite::new(stream, LengthDelimitedCodec::new()),
        }
    }

    /// Send a message (length-prefixed).
    pub async fn send(&mut self, msg: &PeerMessage) -> Result<(), NetError> {
        let bytes = borsh::to_vec(msg).expect("borsh serialization cannot fail");
        self.inner.send(bytes.into()).await?;
        Ok(())
    }

    /// Flush and drop the writer, signalling we are done sending.
    pub async fn finish(mut self) -> Result<(), NetError> {
        self.inner.flush().await?;
        Ok(())
    }
}

/// Framed reader for receiving [`PeerMessage`] from a receive stream.
pub struct MessageStream<R> {
    inner: FramedRead<R, LengthDelimitedCodec>,
}

impl<R: AsyncRead + Unpin> MessageStream<R> {
    pub fn new(stream: R) -> Self {
        Self {
            inner: FramedRead::new(stream, LengthDelimitedCodec::new()),
        }
    }

    /// Receive the next message, or `None` if the stream closed cleanly.
    pub async fn recv(&mut self) -> Result<Option<PeerMessage>, NetError> {
        match self.inner.next().await {
            Some(Ok(bytes)) => borsh::from_slice(&bytes)
                .map(Some)
                .map_err(|e| NetError::Decode(e.to_string())),
            Some(Err(e)) => Err(NetError::Io(e)),
            None => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
