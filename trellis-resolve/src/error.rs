//! Error taxonomy for the resolve-sort-verify pipeline.
//!
//! Failures at any stage abort the entire pipeline for that transaction;
//! nothing partially verified is committed. The core never retries: protocol
//! errors may be retried by the caller against a different peer, while
//! cryptographic, structural and contract errors are definitional.

use thiserror::Error;
use trellis_model::{
    ContractId, Hash, PubKey, SignedTransactionError, StateRef, TransactionError,
};
use trellis_net::NetError;
use trellis_store::StoreError;

/// Pipeline failure.
#[derive(Debug, Error)]
pub enum ResolveError {
    // --- Protocol errors (peer misbehavior or absence of data) ---
    /// The peer has no entry for a requested hash.
    #[error("peer has no entry for hash {0}")]
    HashNotFound(Hash),

    /// A downloaded payload does not hash to the requested id.
    #[error("downloaded payload for {requested} hashes to {received}")]
    DownloadedVsRequestedMismatch { requested: Hash, received: Hash },

    /// The peer answered a batch request with the wrong number of items.
    #[error("requested {requested} items but peer sent {received}")]
    DownloadedVsRequestedSizeMismatch { requested: usize, received: usize },

    /// A data request carried an empty hash set.
    #[error("empty hash list in data request")]
    EmptyRequest,

    // --- Resource errors ---
    /// The dependency graph exceeded the configured download budget.
    /// Fatal: callers never receive a truncated graph.
    #[error("dependency graph exceeds the transaction count limit of {limit}")]
    ExcessivelyLargeTransactionGraph { limit: usize },

    // --- Cryptographic errors ---
    /// A required signature is missing or invalid. Indicates tampering
    /// rather than unavailability.
    #[error(transparent)]
    Signatures(#[from] SignedTransactionError),

    // --- Structural / contract errors ---
    /// A structural invariant does not hold for this transaction.
    #[error("transaction {id} is invalid: {source}")]
    Invalid { id: Hash, source: TransactionError },

    /// The transaction names a notary the identity service does not
    /// recognise.
    #[error("transaction {id} names unrecognised notary {notary}")]
    UnrecognisedNotary { id: Hash, notary: PubKey },

    /// An input reference could not be resolved to a prior output.
    #[error("transaction {id} consumes unknown state {reference}")]
    MissingInput { id: Hash, reference: StateRef },

    /// A referenced attachment is absent locally after the fetch phase.
    #[error("transaction {id} references missing attachment {attachment}")]
    MissingAttachment { id: Hash, attachment: Hash },

    /// No contract logic is registered for the referenced contract id.
    #[error("transaction {id} references unknown contract {contract}")]
    UnknownContract { id: Hash, contract: ContractId },

    /// Contract logic rejected the transaction.
    #[error("contract {contract} rejected transaction {id}: {reason}")]
    ContractRejected {
        id: Hash,
        contract: ContractId,
        reason: String,
    },

    // --- Collaborator errors ---
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Net(#[from] NetError),

    // --- Local / programmer errors ---
    /// An internal invariant was violated. A bug, not peer input.
    #[error("internal error: {0}")]
    Internal(String),
}
