//! Trellis Store
//!
//! Storage collaborators for the resolution pipeline: a transaction store
//! holding locally verified transactions and a content-addressed attachment
//! store. The resolver treats both as dumb maps: validity is decided
//! before anything is inserted, never by the store.
//!
//! Two implementations are provided: redb-backed persistent stores and
//! in-memory stores for tests and simulation.

use thiserror::Error;
use trellis_model::{Hash, SignedTransaction};

pub mod memory;
pub mod redb_store;

pub use memory::{MemoryAttachmentStore, MemoryTransactionStore};
pub use redb_store::{RedbAttachmentStore, RedbTransactionStore};

/// Storage error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),
    #[error("table error: {0}")]
    Table(#[from] redb::TableError),
    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),
    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),
    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("borsh decode error: {0}")]
    Borsh(#[from] borsh::io::Error),
    #[error("invalid stored data: {0}")]
    InvalidData(String),
}

/// Durable map of verified transactions, keyed by canonical id.
///
/// `put` must be idempotent: two concurrent resolutions that learn about
/// the same ancestor must not double-record it, so insert atomically
/// detects and skips a duplicate.
pub trait TransactionStore: Send + Sync {
    /// Look up a transaction by id.
    fn get(&self, id: &Hash) -> Result<Option<SignedTransaction>, StoreError>;

    /// Insert a transaction. Returns `false` (and changes nothing) if a
    /// transaction with the same id is already present.
    fn put(&self, stx: &SignedTransaction) -> Result<bool, StoreError>;

    /// Whether a transaction with this id is present.
    fn contains(&self, id: &Hash) -> Result<bool, StoreError>;
}

/// Content-addressed store of opaque attachment blobs.
pub trait AttachmentStore: Send + Sync {
    /// Whether a blob with this content hash is present.
    fn contains(&self, id: &Hash) -> Result<bool, StoreError>;

    /// Read a blob by content hash.
    fn open(&self, id: &Hash) -> Result<Option<Vec<u8>>, StoreError>;

    /// Insert a blob, returning its content hash. Idempotent.
    fn import(&self, bytes: &[u8]) -> Result<Hash, StoreError>;
}
