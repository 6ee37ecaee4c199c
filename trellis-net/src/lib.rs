//! Trellis Net
//!
//! The peer protocol surface for transaction resolution: wire message
//! types, length-delimited framing, and the transport trait seam.

pub mod error;
pub mod framing;
pub mod messages;
pub mod transport;

// Re-exports
pub use error::NetError;
pub use framing::{MessageSink, MessageStream};
pub use messages::{DataKind, FetchRequest, FetchResponse, PeerMessage};
pub use transport::{BiStream, Connection, Transport, TransportError};
