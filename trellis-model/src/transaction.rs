//! WireTransaction: the atomic state-transition unit of the ledger.
//!
//! A `WireTransaction` is the unsigned body, the thing hashed and signed.
//! A `SignedTransaction` wraps it with accumulated signatures (see
//! [`crate::signed`]).
//!
//! Serialization uses **Borsh** for deterministic hashing and signing. The
//! transaction id is `blake3(borsh(tx))` and is the content address used by
//! storage and by the peer fetch protocol.

use borsh::{BorshDeserialize, BorshSerialize};
use std::collections::HashSet;
use std::fmt;

use crate::crypto::content_hash;
use crate::types::{Hash, PubKey};

/// Identifies the contract logic governing a state.
///
/// The core never executes contracts itself; it hands the resolved
/// transaction to whatever logic the id resolves to (an injected registry).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize)]
pub struct ContractId(pub String);

impl ContractId {
    pub fn new(name: impl Into<String>) -> Self {
        ContractId(name.into())
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A (transaction id, output index) pair identifying one output of one
/// transaction. Equality is structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize)]
pub struct StateRef {
    pub txhash: Hash,
    pub index: u32,
}

impl StateRef {
    pub fn new(txhash: Hash, index: u32) -> Self {
        StateRef { txhash, index }
    }
}

impl fmt::Display for StateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.txhash, self.index)
    }
}

/// An output state: opaque payload plus the metadata the core checks.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TransactionState {
    /// The contract governing this state.
    pub contract: ContractId,
    /// Opaque state payload. Interpretation is left to the contract.
    pub data: Vec<u8>,
    /// The notary whose consent is required to consume this state.
    pub notary: PubKey,
    /// Index of another output of the same transaction this state is
    /// encumbered by, if any.
    pub encumbrance: Option<u32>,
}

/// Arbitrary application data plus the keys that must sign for it.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Command {
    pub data: Vec<u8>,
    pub signers: Vec<PubKey>,
}

/// A window in which the transaction may have been notarised,
/// in milliseconds since the Unix epoch. Only legal on notarised
/// transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TimeWindow {
    pub after_millis: Option<u64>,
    pub before_millis: Option<u64>,
}

/// The unsigned transaction body.
///
/// Field order matches the canonical Borsh serialization order.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct WireTransaction {
    /// References to the prior outputs this transaction consumes.
    pub inputs: Vec<StateRef>,
    /// The states this transaction produces.
    pub outputs: Vec<TransactionState>,
    /// Application commands with their required signers.
    pub commands: Vec<Command>,
    /// Content hashes of attachments needed for verification.
    pub attachments: Vec<Hash>,
    /// The notary, if the transaction consumes anything. Absent only for
    /// issuance transactions.
    pub notary: Option<PubKey>,
    /// Optional notarisation time window. Requires a notary.
    pub time_window: Option<TimeWindow>,
}

impl WireTransaction {
    /// Build a transaction, checking the structural invariants.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        inputs: Vec<StateRef>,
        outputs: Vec<TransactionState>,
        commands: Vec<Command>,
        attachments: Vec<Hash>,
        notary: Option<PubKey>,
        time_window: Option<TimeWindow>,
    ) -> Result<Self, TransactionError> {
        let tx = WireTransaction {
            inputs,
            outputs,
            commands,
            attachments,
            notary,
            time_window,
        };
        tx.check_structural_invariants()?;
        Ok(tx)
    }

    /// Structural invariants that hold for every well-formed transaction,
    /// checkable without resolving any input.
    ///
    /// Re-run on every transaction received from a peer: Borsh decoding
    /// alone does not enforce them.
    pub fn check_structural_invariants(&self) -> Result<(), TransactionError> {
        let mut seen = HashSet::with_capacity(self.inputs.len());
        for input in &self.inputs {
            if !seen.insert(*input) {
                return Err(TransactionError::DuplicateInputs { duplicate: *input });
            }
        }
        if self.notary.is_none() && !self.inputs.is_empty() {
            return Err(TransactionError::MissingNotary);
        }
        if self.time_window.is_some() && self.notary.is_none() {
            return Err(TransactionError::TimeWindowWithoutNotary);
        }
        for (index, output) in self.outputs.iter().enumerate() {
            if let Some(encumbrance) = output.encumbrance {
                if encumbrance as usize == index {
                    return Err(TransactionError::EncumbranceSelfReference { index });
                }
                if encumbrance as usize >= self.outputs.len() {
                    return Err(TransactionError::EncumbranceOutOfRange {
                        index,
                        encumbrance,
                        outputs: self.outputs.len(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Compute the canonical transaction id: `blake3(borsh(self))`.
    pub fn id(&self) -> Hash {
        content_hash(&self.to_borsh())
    }

    /// Serialize to canonical Borsh bytes.
    pub fn to_borsh(&self) -> Vec<u8> {
        borsh::to_vec(self).expect("borsh serialization cannot fail")
    }

    /// Deserialize from Borsh bytes.
    pub fn from_borsh(bytes: &[u8]) -> Result<Self, borsh::io::Error> {
        borsh::from_slice(bytes)
    }

    /// Ids of the transactions whose outputs this transaction consumes,
    /// de-duplicated, in first-occurrence order.
    ///
    /// Insertion order is kept stable so the resolver's frontier (and thus
    /// its download order) is reproducible.
    pub fn dependencies(&self) -> Vec<Hash> {
        let mut seen = HashSet::new();
        let mut deps = Vec::new();
        for input in &self.inputs {
            if seen.insert(input.txhash) {
                deps.push(input.txhash);
            }
        }
        deps
    }

    /// Every key that must sign this transaction: all command signers plus
    /// the notary, if one is set. De-duplicated, first-occurrence order.
    pub fn required_signing_keys(&self) -> Vec<PubKey> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for command in &self.commands {
            for signer in &command.signers {
                if seen.insert(*signer) {
                    keys.push(*signer);
                }
            }
        }
        if let Some(notary) = self.notary {
            if seen.insert(notary) {
                keys.push(notary);
            }
        }
        keys
    }
}

/// Structural transaction failure.
///
/// Covers both construction-time invariants (checkable on the wire form
/// alone) and resolution-time invariants (notary consistency, input
/// encumbrance companionship) checked once inputs are resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    #[error("duplicate input state: {duplicate}")]
    DuplicateInputs { duplicate: StateRef },

    #[error("the notary must be specified explicitly for any transaction that has inputs")]
    MissingNotary,

    #[error("transactions with time-windows must be notarised")]
    TimeWindowWithoutNotary,

    #[error("output {index} is encumbered by itself")]
    EncumbranceSelfReference { index: usize },

    #[error("output {index} encumbrance {encumbrance} is out of range ({outputs} outputs)")]
    EncumbranceOutOfRange {
        index: usize,
        encumbrance: u32,
        outputs: usize,
    },

    #[error("input {state} is encumbered by output {encumbrance} of {txhash}, which is not also consumed")]
    MissingInputEncumbrance {
        state: StateRef,
        txhash: Hash,
        encumbrance: u32,
    },

    #[error("transaction changes the notary of its outputs ({expected} -> {found}) without being a notary-change transaction")]
    NotaryChange { expected: PubKey, found: PubKey },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
