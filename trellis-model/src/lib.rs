//! Trellis Model
//!
//! Pure data types and crypto for the Trellis transaction pipeline,
//! decoupled from storage engines, network stacks, and the resolver.

pub mod crypto;
pub mod resolved;
pub mod signature;
pub mod signed;
pub mod transaction;
pub mod types;

// Re-exports
pub use crypto::{content_hash, SignatureError};
pub use resolved::{Attachment, LedgerTransaction, StateAndRef};
pub use signature::{SignatureMetadata, TransactionSignature};
pub use signed::{SignedTransaction, SignedTransactionError};
pub use transaction::{
    Command, ContractId, StateRef, TimeWindow, TransactionError, TransactionState,
    WireTransaction,
};
pub use types::{Hash, PubKey, Signature};
