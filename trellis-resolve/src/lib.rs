//! Trellis Resolve
//!
//! The transaction resolution pipeline: download a transaction's unknown
//! ancestry from a peer, order it by dependency, verify it transaction by
//! transaction, and record what passes. The vending counterpart that serves
//! such downloads lives here too.
//!
//! The pipeline is deliberately strict: any failure, whether a missing
//! hash, a bad signature, a broken invariant or a contract rejection,
//! aborts the whole resolution. A peer that accepts a transaction has
//! therefore verified its entire ancestry.

pub mod error;
pub mod fetch;
pub mod resolver;
pub mod topsort;
pub mod vendor;
pub mod verifier;

use trellis_store::{AttachmentStore, TransactionStore};

// Re-exports
pub use error::ResolveError;
pub use fetch::{FetchSession, Fetched};
pub use resolver::{DependencyResolver, DEFAULT_TRANSACTION_COUNT_LIMIT};
pub use topsort::topological_sort;
pub use vendor::{DataVendor, VendorStats};
pub use verifier::{
    Contract, ContractRegistry, InMemoryContractRegistry, NotaryLookup, StaticNotaries,
    TransactionVerifier,
};

/// The local collaborators one resolution runs against.
///
/// Borrowed, not owned: the same stores and registries serve many
/// resolutions and vending sessions concurrently.
#[derive(Clone, Copy)]
pub struct ServiceHub<'a> {
    pub transactions: &'a dyn TransactionStore,
    pub attachments: &'a dyn AttachmentStore,
    pub contracts: &'a dyn ContractRegistry,
    pub notaries: &'a dyn NotaryLookup,
}
