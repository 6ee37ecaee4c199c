//! Requester side of the data-vending protocol.
//!
//! A [`FetchSession`] wraps one bidirectional stream to a vending peer and
//! downloads transactions and attachments by hash. Every downloaded payload
//! is authenticated against the requested hash before it is handed to the
//! caller, so a malicious peer cannot substitute data.

use std::collections::HashSet;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use trellis_model::{content_hash, Hash, SignedTransaction};
use trellis_net::messages::{DataKind, FetchRequest, FetchResponse, PeerMessage};
use trellis_net::transport::BiStream;
use trellis_net::{MessageSink, MessageStream, NetError};
use trellis_store::{AttachmentStore, TransactionStore};

use crate::error::ResolveError;

/// How long to wait for a single response frame before giving up on the peer.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(15);

/// Result of one fetch call, split by provenance. Items appear in the same
/// order as the requested hashes within each vector.
#[derive(Debug)]
pub struct Fetched<T> {
    /// Items that were already present locally and were not requested.
    pub from_disk: Vec<T>,
    /// Items downloaded from the peer during this call.
    pub downloaded: Vec<T>,
}

impl<T> Fetched<T> {
    fn empty() -> Self {
        Self {
            from_disk: Vec::new(),
            downloaded: Vec::new(),
        }
    }
}

/// Requester half of a vending session.
pub struct FetchSession<W, R> {
    sink: MessageSink<W>,
    stream: MessageStream<R>,
    response_timeout: Duration,
}

/// Build a session over a freshly opened bidirectional stream.
impl<S: BiStream> From<S> for FetchSession<S::SendStream, S::RecvStream> {
    fn from(stream: S) -> Self {
        let (send, recv) = stream.into_split();
        Self::new(MessageSink::new(send), MessageStream::new(recv))
    }
}

impl<W: AsyncWrite + Unpin, R: AsyncRead + Unpin> FetchSession<W, R> {
    pub fn new(sink: MessageSink<W>, stream: MessageStream<R>) -> Self {
        Self {
            sink,
            stream,
            response_timeout: RESPONSE_TIMEOUT,
        }
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Fetch the transactions for `hashes`, skipping those already in the
    /// local store. Each downloaded payload must hash to the hash it was
    /// requested under.
    pub async fn fetch_transactions(
        &mut self,
        hashes: &[Hash],
        store: &dyn TransactionStore,
    ) -> Result<Fetched<SignedTransaction>, ResolveError> {
        let mut result = Fetched::empty();
        let mut to_request = Vec::new();
        let mut seen = HashSet::new();
        for hash in hashes {
            if !seen.insert(*hash) {
                continue;
            }
            match store.get(hash)? {
                Some(stx) => result.from_disk.push(stx),
                None => to_request.push(*hash),
            }
        }
        if to_request.is_empty() {
            return Ok(result);
        }

        let payloads = self.request(DataKind::Transaction, &to_request).await?;
        for (requested, payload) in to_request.iter().zip(payloads) {
            let stx = SignedTransaction::from_borsh(&payload)
                .map_err(|e| NetError::Decode(e.to_string()))?;
            let received = stx.id();
            if received != *requested {
                return Err(ResolveError::DownloadedVsRequestedMismatch {
                    requested: *requested,
                    received,
                });
            }
            result.downloaded.push(stx);
        }
        Ok(result)
    }

    /// Fetch the attachments for `hashes`, skipping those already in the
    /// local store. Downloaded attachments are authenticated against their
    /// hash and imported into the store before being returned.
    pub async fn fetch_attachments(
        &mut self,
        hashes: &[Hash],
        store: &dyn AttachmentStore,
    ) -> Result<Fetched<Vec<u8>>, ResolveError> {
        let mut result = Fetched::empty();
        let mut to_request = Vec::new();
        let mut seen = HashSet::new();
        for hash in hashes {
            if !seen.insert(*hash) {
                continue;
            }
            match store.open(hash)? {
                Some(bytes) => result.from_disk.push(bytes),
                None => to_request.push(*hash),
            }
        }
        if to_request.is_empty() {
            return Ok(result);
        }

        let payloads = self.request(DataKind::Attachment, &to_request).await?;
        for (requested, payload) in to_request.iter().zip(payloads) {
            let received = content_hash(&payload);
            if received != *requested {
                return Err(ResolveError::DownloadedVsRequestedMismatch {
                    requested: *requested,
                    received,
                });
            }
            store.import(&payload)?;
            result.downloaded.push(payload);
        }
        Ok(result)
    }

    /// Close the session. The peer's serving loop returns once it sees the
    /// end marker.
    pub async fn end(mut self) -> Result<(), ResolveError> {
        self.sink.send(&PeerMessage::Request(FetchRequest::End)).await?;
        self.sink.finish().await?;
        Ok(())
    }

    async fn request(
        &mut self,
        kind: DataKind,
        hashes: &[Hash],
    ) -> Result<Vec<Vec<u8>>, ResolveError> {
        debug!(%kind, count = hashes.len(), "requesting data from peer");
        self.sink
            .send(&PeerMessage::Request(FetchRequest::Data {
                kind,
                hashes: hashes.to_vec(),
            }))
            .await?;

        let reply = tokio::time::timeout(self.response_timeout, self.stream.recv())
            .await
            .map_err(|_| NetError::Timeout(format!("no {kind} response from peer")))??;

        match reply {
            Some(PeerMessage::Response(FetchResponse::Items(items))) => {
                if items.len() != hashes.len() {
                    return Err(ResolveError::DownloadedVsRequestedSizeMismatch {
                        requested: hashes.len(),
                        received: items.len(),
                    });
                }
                Ok(items)
            }
            Some(PeerMessage::Response(FetchResponse::NotFound(hash))) => {
                Err(ResolveError::HashNotFound(hash))
            }
            Some(PeerMessage::Response(FetchResponse::EmptyRequest)) => {
                Err(ResolveError::EmptyRequest)
            }
            Some(PeerMessage::Request(_)) => Err(ResolveError::Net(NetError::UnexpectedMessage(
                "peer sent a request on a vending session".into(),
            ))),
            None => Err(ResolveError::Net(NetError::Closed)),
        }
    }
}
