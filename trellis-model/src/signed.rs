//! SignedTransaction: a wire transaction with its accumulated signatures.
//!
//! Mutable only by accumulating additional signatures; once every required
//! signer is covered it is "fully signed". The transaction body itself is
//! never modified after construction.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::crypto::SignatureError;
use crate::signature::TransactionSignature;
use crate::transaction::WireTransaction;
use crate::types::{Hash, PubKey};

/// A [`WireTransaction`] plus one [`TransactionSignature`] per signer, each
/// over the transaction's digest.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SignedTransaction {
    pub transaction: WireTransaction,
    pub signatures: Vec<TransactionSignature>,
}

impl SignedTransaction {
    pub fn new(transaction: WireTransaction, signatures: Vec<TransactionSignature>) -> Self {
        SignedTransaction {
            transaction,
            signatures,
        }
    }

    /// The canonical transaction id (digest of the Borsh body).
    pub fn id(&self) -> Hash {
        self.transaction.id()
    }

    /// Ids of the transactions this one depends on. See
    /// [`WireTransaction::dependencies`].
    pub fn dependencies(&self) -> Vec<Hash> {
        self.transaction.dependencies()
    }

    /// Return a copy with one more signature appended.
    pub fn with_signature(&self, signature: TransactionSignature) -> Self {
        let mut signatures = self.signatures.clone();
        signatures.push(signature);
        SignedTransaction {
            transaction: self.transaction.clone(),
            signatures,
        }
    }

    /// Required signers for which no signature is present yet.
    ///
    /// Presence only; validity is checked by
    /// [`verify_required_signatures`](Self::verify_required_signatures).
    pub fn missing_signers(&self) -> Vec<PubKey> {
        self.transaction
            .required_signing_keys()
            .into_iter()
            .filter(|key| !self.signatures.iter().any(|sig| sig.by == *key))
            .collect()
    }

    /// True once every required signer has a signature attached.
    pub fn is_fully_signed(&self) -> bool {
        self.missing_signers().is_empty()
    }

    /// Verify that every required signer has a cryptographically valid
    /// signature over this transaction's digest.
    pub fn verify_required_signatures(&self) -> Result<(), SignedTransactionError> {
        let id = self.id();
        for key in self.transaction.required_signing_keys() {
            let signature = self
                .signatures
                .iter()
                .find(|sig| sig.by == key)
                .ok_or(SignedTransactionError::MissingSignature { id, key })?;
            signature
                .verify(id)
                .map_err(|source| SignedTransactionError::InvalidSignature { id, key, source })?;
        }
        Ok(())
    }

    /// Serialize to Borsh bytes (the form stored and sent over the wire).
    pub fn to_borsh(&self) -> Vec<u8> {
        borsh::to_vec(self).expect("borsh serialization cannot fail")
    }

    /// Deserialize from Borsh bytes.
    pub fn from_borsh(bytes: &[u8]) -> Result<Self, borsh::io::Error> {
        borsh::from_slice(bytes)
    }
}

/// Signature-set failure for a specific transaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignedTransactionError {
    #[error("transaction {id} is missing a signature from {key}")]
    MissingSignature { id: Hash, key: PubKey },

    #[error("transaction {id} has an invalid signature from {key}: {source}")]
    InvalidSignature {
        id: Hash,
        key: PubKey,
        source: SignatureError,
    },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
