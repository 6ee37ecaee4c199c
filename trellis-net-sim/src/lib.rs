//! Trellis Net Sim: in-memory Transport implementation
//!
//! Uses `tokio::io::DuplexStream` for bidirectional byte streams and a
//! shared [`ChannelNetwork`] broker for peer lookup. A resolution session
//! runs over exactly one bidirectional stream, so each simulated
//! connection carries a single duplex pair, created at connect time.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::io::{DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, Mutex};
use trellis_model::PubKey;
use trellis_net::transport::{BiStream, Connection, Transport, TransportError};

const DUPLEX_BUF_SIZE: usize = 64 * 1024;

/// Shared network broker routing connections between [`ChannelTransport`]
/// instances registered under their public keys.
#[derive(Clone, Debug, Default)]
pub struct ChannelNetwork {
    peers: Arc<Mutex<HashMap<PubKey, mpsc::Sender<ChannelConnection>>>>,
}

impl ChannelNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    async fn register(&self, pubkey: PubKey, accept_tx: mpsc::Sender<ChannelConnection>) {
        self.peers.lock().await.insert(pubkey, accept_tx);
    }
}

/// In-memory [`Transport`] implementation.
#[derive(Clone, Debug)]
pub struct ChannelTransport {
    pubkey: PubKey,
    network: ChannelNetwork,
    accept_rx: Arc<Mutex<mpsc::Receiver<ChannelConnection>>>,
}

impl ChannelTransport {
    pub async fn new(pubkey: PubKey, network: &ChannelNetwork) -> Self {
        let (accept_tx, accept_rx) = mpsc::channel(64);
        network.register(pubkey, accept_tx).await;
        Self {
            pubkey,
            network: network.clone(),
            accept_rx: Arc::new(Mutex::new(accept_rx)),
        }
    }
}

impl Transport for ChannelTransport {
    type Connection = ChannelConnection;

    fn public_key(&self) -> PubKey {
        self.pubkey
    }

    fn connect(
        &self,
        peer: &PubKey,
    ) -> impl std::future::Future<Output = Result<Self::Connection, TransportError>> + Send {
        let network = self.network.clone();
        let my_pubkey = self.pubkey;
        let peer_pubkey = *peer;

        async move {
            let accept_tx = {
                let peers = network.peers.lock().await;
                peers
                    .get(&peer_pubkey)
                    .ok_or_else(|| {
                        TransportError::Connect(format!("peer {} not registered", peer_pubkey))
                    })?
                    .clone()
            };

            let (mine, theirs) = tokio::io::duplex(DUPLEX_BUF_SIZE);

            accept_tx
                .send(ChannelConnection::new(my_pubkey, theirs))
                .await
                .map_err(|_| {
                    TransportError::Connect(format!("peer {} accept channel closed", peer_pubkey))
                })?;

            Ok(ChannelConnection::new(peer_pubkey, mine))
        }
    }

    fn accept(&self) -> impl std::future::Future<Output = Option<Self::Connection>> + Send {
        let accept_rx = self.accept_rx.clone();
        async move { accept_rx.lock().await.recv().await }
    }
}

/// In-memory connection between two [`ChannelTransport`] instances.
///
/// Carries exactly one bidirectional stream; `open_bi` hands it out once.
pub struct ChannelConnection {
    remote_pubkey: PubKey,
    stream: Mutex<Option<DuplexStream>>,
}

impl ChannelConnection {
    fn new(remote_pubkey: PubKey, stream: DuplexStream) -> Self {
        Self {
            remote_pubkey,
            stream: Mutex::new(Some(stream)),
        }
    }
}

impl std::fmt::Debug for ChannelConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelConnection")
            .field("remote", &self.remote_pubkey)
            .finish()
    }
}

impl Connection for ChannelConnection {
    type Stream = ChannelBiStream;

    fn open_bi(
        &self,
    ) -> impl std::future::Future<Output = Result<Self::Stream, TransportError>> + Send {
        async move {
            let stream = self.stream.lock().await.take().ok_or_else(|| {
                TransportError::Stream("stream already opened on this connection".into())
            })?;
            Ok(ChannelBiStream(stream))
        }
    }

    fn remote_public_key(&self) -> PubKey {
        self.remote_pubkey
    }
}

/// In-memory bidirectional stream backed by a single `DuplexStream`.
///
/// Each side gets one end of the duplex pair: writes on one end are reads
/// on the other.
pub struct ChannelBiStream(DuplexStream);

impl BiStream for ChannelBiStream {
    type SendStream = WriteHalf<DuplexStream>;
    type RecvStream = ReadHalf<DuplexStream>;

    fn into_split(self) -> (Self::SendStream, Self::RecvStream) {
        let (read, write) = tokio::io::split(self.0);
        (write, read)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
