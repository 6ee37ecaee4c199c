//! Transaction verification against local state and contract logic.
//!
//! The verifier takes a dependency-ordered batch, resolves each
//! transaction's inputs and attachments, checks its invariants and runs its
//! contracts, and records it in the local store. Recording happens per
//! transaction so every recorded transaction has a fully recorded ancestry,
//! even when a later transaction in the batch fails.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use trellis_model::{
    Attachment, ContractId, Hash, LedgerTransaction, PubKey, SignedTransaction, StateAndRef,
};
use trellis_store::{AttachmentStore, TransactionStore};

use crate::error::ResolveError;
use crate::ServiceHub;

/// Contract logic attached to output states via their [`ContractId`].
///
/// Implementations must be pure functions of the transaction: the same
/// transaction must verify identically on every node.
pub trait Contract: Send + Sync {
    fn verify(&self, tx: &LedgerTransaction) -> Result<(), String>;
}

/// Resolves a [`ContractId`] to its logic.
pub trait ContractRegistry: Send + Sync {
    fn get(&self, id: &ContractId) -> Option<Arc<dyn Contract>>;
}

/// Simple map-backed [`ContractRegistry`].
#[derive(Default, Clone)]
pub struct InMemoryContractRegistry {
    contracts: HashMap<ContractId, Arc<dyn Contract>>,
}

impl InMemoryContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: ContractId, contract: Arc<dyn Contract>) {
        self.contracts.insert(id, contract);
    }
}

impl ContractRegistry for InMemoryContractRegistry {
    fn get(&self, id: &ContractId) -> Option<Arc<dyn Contract>> {
        self.contracts.get(id).cloned()
    }
}

/// Decides whether a key belongs to a recognised notary.
pub trait NotaryLookup: Send + Sync {
    fn is_notary(&self, key: &PubKey) -> bool;
}

/// Fixed notary set, known at construction.
#[derive(Default, Clone)]
pub struct StaticNotaries {
    keys: HashSet<PubKey>,
}

impl StaticNotaries {
    pub fn new(keys: impl IntoIterator<Item = PubKey>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }
}

impl NotaryLookup for StaticNotaries {
    fn is_notary(&self, key: &PubKey) -> bool {
        self.keys.contains(key)
    }
}

/// Verifies and records dependency-ordered transaction batches.
pub struct TransactionVerifier<'a> {
    services: ServiceHub<'a>,
    check_signatures: bool,
}

impl<'a> TransactionVerifier<'a> {
    pub fn new(services: ServiceHub<'a>) -> Self {
        Self {
            services,
            check_signatures: true,
        }
    }

    /// Skip signature checks. Only for trusted local data, never for
    /// transactions downloaded from a peer.
    pub fn with_check_signatures(mut self, check: bool) -> Self {
        self.check_signatures = check;
        self
    }

    /// Verify a dependency-ordered batch and record each transaction as it
    /// passes. Returns the resolved form of every verified transaction.
    ///
    /// On failure everything verified before the failing transaction stays
    /// recorded; the failing one and its dependents do not.
    pub fn verify_and_record(
        &self,
        sorted: Vec<SignedTransaction>,
    ) -> Result<Vec<LedgerTransaction>, ResolveError> {
        let mut batch: HashMap<Hash, SignedTransaction> = HashMap::new();
        let mut verified = Vec::with_capacity(sorted.len());
        for stx in sorted {
            let ltx = self.verify_one(&stx, &batch)?;
            self.services.transactions.put(&stx)?;
            debug!(id = %ltx.id, "verified and recorded transaction");
            batch.insert(ltx.id, stx);
            verified.push(ltx);
        }
        Ok(verified)
    }

    /// Run the full check sequence for one transaction without recording
    /// it. `batch` holds transactions verified earlier in the same pass
    /// whose outputs may be consumed here.
    pub fn verify_one(
        &self,
        stx: &SignedTransaction,
        batch: &HashMap<Hash, SignedTransaction>,
    ) -> Result<LedgerTransaction, ResolveError> {
        let id = stx.id();

        if self.check_signatures {
            stx.verify_required_signatures()?;
        }

        stx.transaction
            .check_structural_invariants()
            .map_err(|source| ResolveError::Invalid { id, source })?;

        if let Some(notary) = stx.transaction.notary {
            if !self.services.notaries.is_notary(&notary) {
                return Err(ResolveError::UnrecognisedNotary { id, notary });
            }
        }

        let ltx = self.resolve(stx, batch)?;

        for contract_id in ltx.contracts() {
            let contract = self
                .services
                .contracts
                .get(&contract_id)
                .ok_or_else(|| ResolveError::UnknownContract {
                    id,
                    contract: contract_id.clone(),
                })?;
            contract
                .verify(&ltx)
                .map_err(|reason| ResolveError::ContractRejected {
                    id,
                    contract: contract_id,
                    reason,
                })?;
        }

        Ok(ltx)
    }

    /// Resolve input references and attachments into a
    /// [`LedgerTransaction`], consulting the in-pass batch before the
    /// store.
    fn resolve(
        &self,
        stx: &SignedTransaction,
        batch: &HashMap<Hash, SignedTransaction>,
    ) -> Result<LedgerTransaction, ResolveError> {
        let id = stx.id();
        let tx = &stx.transaction;

        let mut inputs = Vec::with_capacity(tx.inputs.len());
        for reference in &tx.inputs {
            let source = match batch.get(&reference.txhash) {
                Some(source) => Some(source.clone()),
                None => self.services.transactions.get(&reference.txhash)?,
            };
            let state = source
                .as_ref()
                .and_then(|source| source.transaction.outputs.get(reference.index as usize))
                .cloned()
                .ok_or(ResolveError::MissingInput {
                    id,
                    reference: *reference,
                })?;
            inputs.push(StateAndRef {
                state,
                reference: *reference,
            });
        }

        let mut attachments = Vec::with_capacity(tx.attachments.len());
        for attachment_id in &tx.attachments {
            let bytes = self
                .services
                .attachments
                .open(attachment_id)?
                .ok_or(ResolveError::MissingAttachment {
                    id,
                    attachment: *attachment_id,
                })?;
            attachments.push(Attachment {
                id: *attachment_id,
                bytes,
            });
        }

        LedgerTransaction::new(
            id,
            inputs,
            tx.outputs.clone(),
            tx.commands.clone(),
            attachments,
            tx.notary,
            tx.time_window,
        )
        .map_err(|source| ResolveError::Invalid { id, source })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
