//! Error types for the trellis-net crate

use thiserror::Error;

/// Network layer errors for session streams and framing.
#[derive(Error, Debug)]
pub enum NetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("message decode error: {0}")]
    Decode(String),

    #[error("peer closed the stream")]
    Closed,

    #[error("protocol timeout: {0}")]
    Timeout(String),

    #[error("unexpected message: {0}")]
    UnexpectedMessage(String),
}
