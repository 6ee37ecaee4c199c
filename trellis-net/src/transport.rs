//! Transport abstraction for Trellis networking
//!
//! Decouples the fetch/vend protocol from any concrete network stack.
//! Production nodes plug in their QUIC/TCP transport; tests and simulation
//! use the in-memory implementation from `trellis-net-sim`.

use std::fmt;

use trellis_model::PubKey;

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("accept failed: {0}")]
    Accept(String),
    #[error("stream error: {0}")]
    Stream(String),
}

/// A bidirectional byte stream (send + receive half).
///
/// Both halves must be independently usable. Implementations are expected
/// to carry length-delimited frames via
/// [`MessageSink`](crate::framing::MessageSink) /
/// [`MessageStream`](crate::framing::MessageStream).
pub trait BiStream: Send + 'static {
    /// The send half of the stream.
    type SendStream: tokio::io::AsyncWrite + Send + Unpin;
    /// The receive half of the stream.
    type RecvStream: tokio::io::AsyncRead + Send + Unpin;

    /// Split into send and receive halves.
    fn into_split(self) -> (Self::SendStream, Self::RecvStream);
}

/// A connection to a remote peer that can open bidirectional streams.
pub trait Connection: Send + Sync + 'static {
    /// The bidirectional stream type produced by this connection.
    type Stream: BiStream;

    /// Open a new bidirectional stream on this connection.
    fn open_bi(
        &self,
    ) -> impl std::future::Future<Output = Result<Self::Stream, TransportError>> + Send;

    /// The remote peer's public key.
    fn remote_public_key(&self) -> PubKey;
}

/// Transport layer abstraction.
///
/// Provides peer identity, outbound connections, and inbound connection
/// acceptance.
pub trait Transport: Send + Sync + fmt::Debug + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;

    /// This node's public key (identity).
    fn public_key(&self) -> PubKey;

    /// Connect to a remote peer by public key.
    fn connect(
        &self,
        peer: &PubKey,
    ) -> impl std::future::Future<Output = Result<Self::Connection, TransportError>> + Send;

    /// Accept an incoming connection (resolves to `None` on shutdown).
    fn accept(
        &self,
    ) -> impl std::future::Future<Output = Option<Self::Connection>> + Send;
}
