//! Shared harness for resolution tests over the in-memory transport.

#![allow(dead_code)]

use std::sync::Arc;

use tokio::task::JoinHandle;

use trellis_model::{
    crypto, Command, ContractId, Hash, PubKey, SignatureMetadata, SignedTransaction, StateRef,
    TransactionSignature, TransactionState, WireTransaction,
};
use trellis_net::{Connection, Transport};
use trellis_net_sim::{ChannelNetwork, ChannelTransport};
use tokio::io::{DuplexStream, ReadHalf, WriteHalf};
use trellis_resolve::{
    Contract, DataVendor, FetchSession, InMemoryContractRegistry, ResolveError, ServiceHub,
    StaticNotaries, VendorStats,
};
use trellis_store::{
    AttachmentStore, MemoryAttachmentStore, MemoryTransactionStore, TransactionStore,
};

pub const PLATFORM_VERSION: u32 = 1;

pub fn signing_key(seed: u8) -> ed25519_dalek::SigningKey {
    ed25519_dalek::SigningKey::from_bytes(&[seed; 32])
}

pub fn notary_signing_key() -> ed25519_dalek::SigningKey {
    signing_key(200)
}

pub fn notary() -> PubKey {
    crypto::public_key(&notary_signing_key())
}

pub struct AcceptAll;

impl Contract for AcceptAll {
    fn verify(&self, _tx: &trellis_model::LedgerTransaction) -> Result<(), String> {
        Ok(())
    }
}

pub struct RejectAll;

impl Contract for RejectAll {
    fn verify(&self, _tx: &trellis_model::LedgerTransaction) -> Result<(), String> {
        Err("rejected by test contract".into())
    }
}

/// Registry accepting everything under the "test" contract id.
pub fn accept_all_registry() -> InMemoryContractRegistry {
    let mut registry = InMemoryContractRegistry::new();
    registry.register(ContractId::new("test"), Arc::new(AcceptAll));
    registry
}

pub fn output_state(data: Vec<u8>) -> TransactionState {
    TransactionState {
        contract: ContractId::new("test"),
        data,
        notary: notary(),
        encumbrance: None,
    }
}

/// An issuance: no inputs, no notary, signed by the issuer alone.
pub fn issue(signer: &ed25519_dalek::SigningKey, data: Vec<u8>) -> SignedTransaction {
    let tx = WireTransaction::new(
        vec![],
        vec![output_state(data)],
        vec![Command {
            data: vec![],
            signers: vec![crypto::public_key(signer)],
        }],
        vec![],
        None,
        None,
    )
    .expect("test issuance is structurally valid");
    sign(tx, &[signer])
}

/// A spend: consumes `inputs` under the test notary, signed by the spender
/// and the notary.
pub fn spend(
    signer: &ed25519_dalek::SigningKey,
    inputs: Vec<StateRef>,
    data: Vec<u8>,
) -> SignedTransaction {
    spend_with_attachments(signer, inputs, data, vec![])
}

pub fn spend_with_attachments(
    signer: &ed25519_dalek::SigningKey,
    inputs: Vec<StateRef>,
    data: Vec<u8>,
    attachments: Vec<Hash>,
) -> SignedTransaction {
    let tx = WireTransaction::new(
        inputs,
        vec![output_state(data)],
        vec![Command {
            data: vec![],
            signers: vec![crypto::public_key(signer)],
        }],
        attachments,
        Some(notary()),
        None,
    )
    .expect("test spend is structurally valid");
    sign(tx, &[signer, &notary_signing_key()])
}

/// A spend whose output is governed by `contract` instead of "test".
pub fn spend_with_contract(
    signer: &ed25519_dalek::SigningKey,
    inputs: Vec<StateRef>,
    data: Vec<u8>,
    contract: &str,
) -> SignedTransaction {
    let mut state = output_state(data);
    state.contract = ContractId::new(contract);
    let tx = WireTransaction::new(
        inputs,
        vec![state],
        vec![Command {
            data: vec![],
            signers: vec![crypto::public_key(signer)],
        }],
        vec![],
        Some(notary()),
        None,
    )
    .expect("test spend is structurally valid");
    sign(tx, &[signer, &notary_signing_key()])
}

fn sign(tx: WireTransaction, keys: &[&ed25519_dalek::SigningKey]) -> SignedTransaction {
    let id = tx.id();
    let signatures = keys
        .iter()
        .map(|key| TransactionSignature::sign(key, id, SignatureMetadata::new(PLATFORM_VERSION)))
        .collect();
    SignedTransaction::new(tx, signatures)
}

/// A peer with populated stores that vends data over the sim transport.
pub struct VendorNode {
    pub pubkey: PubKey,
    pub transport: ChannelTransport,
    pub transactions: Arc<MemoryTransactionStore>,
    pub attachments: Arc<MemoryAttachmentStore>,
}

impl VendorNode {
    pub async fn new(seed: u8, network: &ChannelNetwork) -> Self {
        let pubkey = PubKey([seed; 32]);
        Self {
            pubkey,
            transport: ChannelTransport::new(pubkey, network).await,
            transactions: Arc::new(MemoryTransactionStore::new()),
            attachments: Arc::new(MemoryAttachmentStore::new()),
        }
    }

    pub fn hold(&self, transactions: &[&SignedTransaction]) {
        for stx in transactions {
            self.transactions.put(stx).expect("populate vendor store");
        }
    }

    pub fn hold_attachment(&self, bytes: &[u8]) -> Hash {
        self.attachments
            .import(bytes)
            .expect("populate vendor attachments")
    }

    /// Accept one connection and serve it to completion.
    pub fn spawn_serve(&self) -> JoinHandle<Result<VendorStats, ResolveError>> {
        let transport = self.transport.clone();
        let transactions = Arc::clone(&self.transactions);
        let attachments = Arc::clone(&self.attachments);
        tokio::spawn(async move {
            let conn = transport.accept().await.expect("vendor accepts");
            let stream = conn.open_bi().await.expect("vendor opens stream");
            DataVendor::new(&*transactions, &*attachments)
                .serve_stream(stream)
                .await
        })
    }
}

/// A session over the sim transport's duplex stream halves.
pub type SimSession = FetchSession<WriteHalf<DuplexStream>, ReadHalf<DuplexStream>>;

/// A peer with empty stores that resolves against a vendor.
pub struct ResolverNode {
    pub pubkey: PubKey,
    pub transport: ChannelTransport,
    pub transactions: MemoryTransactionStore,
    pub attachments: MemoryAttachmentStore,
    pub contracts: InMemoryContractRegistry,
    pub notaries: StaticNotaries,
}

impl ResolverNode {
    pub async fn new(seed: u8, network: &ChannelNetwork) -> Self {
        let pubkey = PubKey([seed; 32]);
        Self {
            pubkey,
            transport: ChannelTransport::new(pubkey, network).await,
            transactions: MemoryTransactionStore::new(),
            attachments: MemoryAttachmentStore::new(),
            contracts: accept_all_registry(),
            notaries: StaticNotaries::new([notary()]),
        }
    }

    pub fn services(&self) -> ServiceHub<'_> {
        ServiceHub {
            transactions: &self.transactions,
            attachments: &self.attachments,
            contracts: &self.contracts,
            notaries: &self.notaries,
        }
    }

    /// Connect to `peer` and open a vending session on a fresh stream.
    pub async fn session(&self, peer: PubKey) -> SimSession {
        let conn = self.transport.connect(&peer).await.expect("connect");
        let stream = conn.open_bi().await.expect("open stream");
        FetchSession::from(stream)
    }
}

pub fn ids(transactions: &[trellis_model::LedgerTransaction]) -> Vec<Hash> {
    transactions.iter().map(|ltx| ltx.id).collect()
}
