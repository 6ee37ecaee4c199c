//! Responder side of the data-vending protocol.
//!
//! A [`DataVendor`] serves one requester session over a bidirectional
//! stream: it answers [`FetchRequest::Data`] batches from the local stores
//! until the requester sends [`FetchRequest::End`] or drops the stream.
//! The vendor only ever reads from its stores, so serving cannot corrupt
//! local state.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use trellis_model::Hash;
use trellis_net::messages::{DataKind, FetchRequest, FetchResponse, PeerMessage};
use trellis_net::transport::BiStream;
use trellis_net::{MessageSink, MessageStream, NetError};
use trellis_store::{AttachmentStore, TransactionStore};

use crate::error::ResolveError;

/// What one serving session handed out, for observability and tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VendorStats {
    /// Number of `Data` requests answered with `Items`.
    pub requests_served: usize,
    /// Transaction hashes served, in the order they were requested.
    pub transactions_sent: Vec<Hash>,
    /// Attachment hashes served, in the order they were requested.
    pub attachments_sent: Vec<Hash>,
}

/// Serves transactions and attachments from local stores to one peer.
pub struct DataVendor<'a> {
    transactions: &'a dyn TransactionStore,
    attachments: &'a dyn AttachmentStore,
}

impl<'a> DataVendor<'a> {
    pub fn new(
        transactions: &'a dyn TransactionStore,
        attachments: &'a dyn AttachmentStore,
    ) -> Self {
        Self {
            transactions,
            attachments,
        }
    }

    /// Serve one session over a freshly opened bidirectional stream.
    pub async fn serve_stream<S: BiStream>(&self, stream: S) -> Result<VendorStats, ResolveError> {
        let (send, recv) = stream.into_split();
        self.serve(MessageSink::new(send), MessageStream::new(recv))
            .await
    }

    /// Serve requests until the requester ends the session.
    ///
    /// A closed stream also terminates the loop: the requester may abandon
    /// the session at any point and the vendor must not hang.
    pub async fn serve<W, R>(
        &self,
        mut sink: MessageSink<W>,
        mut stream: MessageStream<R>,
    ) -> Result<VendorStats, ResolveError>
    where
        W: AsyncWrite + Unpin,
        R: AsyncRead + Unpin,
    {
        let mut stats = VendorStats::default();
        loop {
            let request = match stream.recv().await? {
                Some(PeerMessage::Request(request)) => request,
                Some(PeerMessage::Response(_)) => {
                    return Err(ResolveError::Net(NetError::UnexpectedMessage(
                        "peer sent a response on a vending session".into(),
                    )))
                }
                // Requester went away without an End marker.
                None => {
                    debug!("session stream closed, ending serve loop");
                    return Ok(stats);
                }
            };

            match request {
                FetchRequest::Data { kind, hashes } => {
                    if hashes.is_empty() {
                        warn!("rejecting empty data request");
                        sink.send(&PeerMessage::Response(FetchResponse::EmptyRequest))
                            .await?;
                        return Err(ResolveError::EmptyRequest);
                    }
                    let items = match self.collect(kind, &hashes) {
                        Ok(items) => items,
                        Err(ResolveError::HashNotFound(hash)) => {
                            warn!(%kind, %hash, "no entry for requested hash");
                            sink.send(&PeerMessage::Response(FetchResponse::NotFound(hash)))
                                .await?;
                            return Err(ResolveError::HashNotFound(hash));
                        }
                        Err(e) => return Err(e),
                    };
                    debug!(%kind, count = items.len(), "serving data batch");
                    sink.send(&PeerMessage::Response(FetchResponse::Items(items)))
                        .await?;
                    stats.requests_served += 1;
                    match kind {
                        DataKind::Transaction => stats.transactions_sent.extend(hashes),
                        DataKind::Attachment => stats.attachments_sent.extend(hashes),
                    }
                }
                FetchRequest::End => {
                    debug!(
                        served = stats.requests_served,
                        "session ended by requester"
                    );
                    return Ok(stats);
                }
            }
        }
    }

    /// Load payloads for a batch, in request order.
    fn collect(&self, kind: DataKind, hashes: &[Hash]) -> Result<Vec<Vec<u8>>, ResolveError> {
        let mut items = Vec::with_capacity(hashes.len());
        for hash in hashes {
            let payload = match kind {
                DataKind::Transaction => self.transactions.get(hash)?.map(|stx| stx.to_borsh()),
                DataKind::Attachment => self.attachments.open(hash)?,
            };
            items.push(payload.ok_or(ResolveError::HashNotFound(*hash))?);
        }
        Ok(items)
    }
}
