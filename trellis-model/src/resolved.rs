//! LedgerTransaction: the fully resolved view of a transaction.
//!
//! Derived from a [`WireTransaction`] by resolving every input
//! [`StateRef`](crate::transaction::StateRef) into the concrete prior output
//! it consumes and loading the referenced attachments. This is the form
//! contracts execute against.
//!
//! Construction runs the resolution-time structural checks that cannot be
//! performed on the wire form alone: notary consistency across inputs and
//! outputs, and input encumbrance companionship.

use crate::transaction::{
    Command, ContractId, StateRef, TimeWindow, TransactionError, TransactionState,
};
use crate::types::{Hash, PubKey};

/// A resolved input: the prior output state together with the reference
/// that named it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateAndRef {
    pub state: TransactionState,
    pub reference: StateRef,
}

/// An attachment blob loaded for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub id: Hash,
    pub bytes: Vec<u8>,
}

/// A transaction with all inputs resolved and attachments loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerTransaction {
    pub id: Hash,
    pub inputs: Vec<StateAndRef>,
    pub outputs: Vec<TransactionState>,
    pub commands: Vec<Command>,
    pub attachments: Vec<Attachment>,
    pub notary: Option<PubKey>,
    pub time_window: Option<TimeWindow>,
}

impl LedgerTransaction {
    /// Build the resolved view, checking the resolution-time invariants.
    pub fn new(
        id: Hash,
        inputs: Vec<StateAndRef>,
        outputs: Vec<TransactionState>,
        commands: Vec<Command>,
        attachments: Vec<Attachment>,
        notary: Option<PubKey>,
        time_window: Option<TimeWindow>,
    ) -> Result<Self, TransactionError> {
        let ltx = LedgerTransaction {
            id,
            inputs,
            outputs,
            commands,
            attachments,
            notary,
            time_window,
        };
        ltx.check_no_notary_change()?;
        ltx.check_input_encumbrances()?;
        Ok(ltx)
    }

    /// The notary must stay the same. We cannot tell how inputs and outputs
    /// connect, so if there are any inputs, every input and every output
    /// must carry the transaction's notary.
    fn check_no_notary_change(&self) -> Result<(), TransactionError> {
        let notary = match self.notary {
            Some(notary) if !self.inputs.is_empty() => notary,
            _ => return Ok(()),
        };
        for input in &self.inputs {
            if input.state.notary != notary {
                return Err(TransactionError::NotaryChange {
                    expected: notary,
                    found: input.state.notary,
                });
            }
        }
        for output in &self.outputs {
            if output.notary != notary {
                return Err(TransactionError::NotaryChange {
                    expected: notary,
                    found: output.notary,
                });
            }
        }
        Ok(())
    }

    /// Every encumbrance named by a consumed state must be satisfied by
    /// another input drawn from the same source transaction.
    fn check_input_encumbrances(&self) -> Result<(), TransactionError> {
        for input in &self.inputs {
            let encumbrance = match input.state.encumbrance {
                Some(encumbrance) => encumbrance,
                None => continue,
            };
            let companion_present = self.inputs.iter().any(|other| {
                other.reference.txhash == input.reference.txhash
                    && other.reference.index == encumbrance
            });
            if !companion_present {
                return Err(TransactionError::MissingInputEncumbrance {
                    state: input.reference,
                    txhash: input.reference.txhash,
                    encumbrance,
                });
            }
        }
        Ok(())
    }

    /// The distinct contracts referenced by inputs and outputs, in
    /// first-occurrence order (inputs before outputs).
    pub fn contracts(&self) -> Vec<ContractId> {
        let mut seen = std::collections::HashSet::new();
        let mut contracts = Vec::new();
        let referenced = self
            .inputs
            .iter()
            .map(|input| &input.state.contract)
            .chain(self.outputs.iter().map(|output| &output.contract));
        for contract in referenced {
            if seen.insert(contract.clone()) {
                contracts.push(contract.clone());
            }
        }
        contracts
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
