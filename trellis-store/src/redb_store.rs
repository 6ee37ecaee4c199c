//! redb-backed persistent stores.
//!
//! One database file per store, one table per data kind:
//! - `transactions.db`: blake3(borsh(tx)) → borsh SignedTransaction bytes
//! - `attachments.db`: blake3(blob) → raw blob bytes
//!
//! Inserts are idempotent: the presence check and the insert happen inside
//! a single write transaction, so concurrent resolutions recording the same
//! ancestor cannot double-insert.

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition};
use trellis_model::crypto::content_hash;
use trellis_model::{Hash, SignedTransaction};

use crate::{AttachmentStore, StoreError, TransactionStore};

/// Transactions table: transaction id → borsh SignedTransaction bytes
const TABLE_TRANSACTIONS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("transactions");

/// Attachments table: content hash → raw blob bytes
const TABLE_ATTACHMENTS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("attachments");

/// Persistent [`TransactionStore`] over a redb database.
pub struct RedbTransactionStore {
    db: Database,
}

impl RedbTransactionStore {
    /// Open or create `transactions.db` in the given directory.
    pub fn open(store_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = open_database(store_dir.as_ref(), "transactions.db", TABLE_TRANSACTIONS)?;
        Ok(Self { db })
    }
}

impl TransactionStore for RedbTransactionStore {
    fn get(&self, id: &Hash) -> Result<Option<SignedTransaction>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_TRANSACTIONS)?;
        match table.get(id.as_bytes().as_slice())? {
            Some(guard) => Ok(Some(SignedTransaction::from_borsh(guard.value())?)),
            None => Ok(None),
        }
    }

    fn put(&self, stx: &SignedTransaction) -> Result<bool, StoreError> {
        let id = stx.id();
        let bytes = stx.to_borsh();
        let write_txn = self.db.begin_write()?;
        let inserted = {
            let mut table = write_txn.open_table(TABLE_TRANSACTIONS)?;
            if table.get(id.as_bytes().as_slice())?.is_some() {
                false
            } else {
                table.insert(id.as_bytes().as_slice(), bytes.as_slice())?;
                true
            }
        };
        write_txn.commit()?;
        Ok(inserted)
    }

    fn contains(&self, id: &Hash) -> Result<bool, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_TRANSACTIONS)?;
        Ok(table.get(id.as_bytes().as_slice())?.is_some())
    }
}

/// Persistent [`AttachmentStore`] over a redb database.
pub struct RedbAttachmentStore {
    db: Database,
}

impl RedbAttachmentStore {
    /// Open or create `attachments.db` in the given directory.
    pub fn open(store_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = open_database(store_dir.as_ref(), "attachments.db", TABLE_ATTACHMENTS)?;
        Ok(Self { db })
    }
}

impl AttachmentStore for RedbAttachmentStore {
    fn contains(&self, id: &Hash) -> Result<bool, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_ATTACHMENTS)?;
        Ok(table.get(id.as_bytes().as_slice())?.is_some())
    }

    fn open(&self, id: &Hash) -> Result<Option<Vec<u8>>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_ATTACHMENTS)?;
        Ok(table
            .get(id.as_bytes().as_slice())?
            .map(|guard| guard.value().to_vec()))
    }

    fn import(&self, bytes: &[u8]) -> Result<Hash, StoreError> {
        let id = content_hash(bytes);
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TABLE_ATTACHMENTS)?;
            if table.get(id.as_bytes().as_slice())?.is_none() {
                table.insert(id.as_bytes().as_slice(), bytes)?;
            }
        }
        write_txn.commit()?;
        Ok(id)
    }
}

/// Open a database file, creating the directory and the table if needed.
fn open_database(
    dir: &Path,
    file_name: &str,
    table: TableDefinition<&[u8], &[u8]>,
) -> Result<Database, StoreError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| StoreError::InvalidData(format!("cannot create dir: {e}")))?;
    let db = Database::builder().create(dir.join(file_name))?;
    {
        let write_txn = db.begin_write()?;
        let _ = write_txn.open_table(table)?;
        write_txn.commit()?;
    }
    Ok(db)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
