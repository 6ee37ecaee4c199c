//! Wire messages for the data-vending protocol.
//!
//! One request/response session runs between a resolving node (requester)
//! and a vending peer (responder). The requester drives: it sends
//! [`FetchRequest::Data`] batches and closes the session with
//! [`FetchRequest::End`], the only way the responder's serving loop
//! terminates normally.
//!
//! Messages are Borsh-encoded and length-delimited on the stream (see
//! [`crate::framing`]).

use borsh::{BorshDeserialize, BorshSerialize};
use trellis_model::Hash;

/// The kind of data a batch request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum DataKind {
    Transaction,
    Attachment,
}

impl std::fmt::Display for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataKind::Transaction => f.write_str("transaction"),
            DataKind::Attachment => f.write_str("attachment"),
        }
    }
}

/// A requester-to-responder message.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum FetchRequest {
    /// Request the payloads for `hashes` (must be non-empty) of one kind.
    Data { kind: DataKind, hashes: Vec<Hash> },
    /// Close the session; the responder returns control to its caller.
    End,
}

/// A responder-to-requester message.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum FetchResponse {
    /// One payload per requested hash, in request order.
    Items(Vec<Vec<u8>>),
    /// The responder has no entry for this hash; the exchange has failed.
    NotFound(Hash),
    /// The request carried an empty hash set; the exchange has failed.
    EmptyRequest,
}

/// Envelope for everything that crosses the session stream.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum PeerMessage {
    Request(FetchRequest),
    Response(FetchResponse),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
