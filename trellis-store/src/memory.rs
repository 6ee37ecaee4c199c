//! In-memory stores for tests and simulation.

use std::collections::HashMap;
use std::sync::RwLock;

use trellis_model::crypto::content_hash;
use trellis_model::{Hash, SignedTransaction};

use crate::{AttachmentStore, StoreError, TransactionStore};

/// In-memory [`TransactionStore`].
#[derive(Default)]
pub struct MemoryTransactionStore {
    transactions: RwLock<HashMap<Hash, SignedTransaction>>,
}

impl MemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of transactions held.
    pub fn len(&self) -> usize {
        self.transactions.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TransactionStore for MemoryTransactionStore {
    fn get(&self, id: &Hash) -> Result<Option<SignedTransaction>, StoreError> {
        Ok(self.transactions.read().unwrap().get(id).cloned())
    }

    fn put(&self, stx: &SignedTransaction) -> Result<bool, StoreError> {
        let mut transactions = self.transactions.write().unwrap();
        match transactions.entry(stx.id()) {
            std::collections::hash_map::Entry::Occupied(_) => Ok(false),
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(stx.clone());
                Ok(true)
            }
        }
    }

    fn contains(&self, id: &Hash) -> Result<bool, StoreError> {
        Ok(self.transactions.read().unwrap().contains_key(id))
    }
}

/// In-memory [`AttachmentStore`].
#[derive(Default)]
pub struct MemoryAttachmentStore {
    attachments: RwLock<HashMap<Hash, Vec<u8>>>,
}

impl MemoryAttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AttachmentStore for MemoryAttachmentStore {
    fn contains(&self, id: &Hash) -> Result<bool, StoreError> {
        Ok(self.attachments.read().unwrap().contains_key(id))
    }

    fn open(&self, id: &Hash) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.attachments.read().unwrap().get(id).cloned())
    }

    fn import(&self, bytes: &[u8]) -> Result<Hash, StoreError> {
        let id = content_hash(bytes);
        self.attachments
            .write()
            .unwrap()
            .entry(id)
            .or_insert_with(|| bytes.to_vec());
        Ok(id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_model::{ContractId, PubKey, TransactionState, WireTransaction};

    fn test_stx(tag: u8) -> SignedTransaction {
        let tx = WireTransaction::new(
            vec![],
            vec![TransactionState {
                contract: ContractId::new("test"),
                data: vec![tag],
                notary: PubKey([9u8; 32]),
                encumbrance: None,
            }],
            vec![],
            vec![],
            None,
            None,
        )
        .unwrap();
        SignedTransaction::new(tx, vec![])
    }

    #[test]
    fn put_is_idempotent() {
        let store = MemoryTransactionStore::new();
        let stx = test_stx(1);
        assert!(store.put(&stx).unwrap());
        assert!(!store.put(&stx).unwrap());
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&stx.id()).unwrap(), Some(stx));
    }

    #[test]
    fn attachment_roundtrip() {
        let store = MemoryAttachmentStore::new();
        let id = store.import(b"blob").unwrap();
        assert!(store.contains(&id).unwrap());
        assert_eq!(store.open(&id).unwrap(), Some(b"blob".to_vec()));
    }
}
