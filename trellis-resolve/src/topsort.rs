//! Dependency ordering for downloaded transaction batches.
//!
//! Verification consumes transactions parents-first, so a batch is sorted
//! so that every transaction appears before any transaction that consumes
//! one of its outputs. Input references to transactions outside the batch
//! are ignored here; the verifier resolves those against the local store.

use std::collections::{HashMap, HashSet};

use trellis_model::{Hash, SignedTransaction};

use crate::error::ResolveError;

/// Sort `transactions` into dependency order (dependencies first).
///
/// The order is deterministic for a given input order: ties between
/// unrelated transactions are broken by their position in the input.
pub fn topological_sort(
    transactions: Vec<SignedTransaction>,
) -> Result<Vec<SignedTransaction>, ResolveError> {
    let ids: Vec<Hash> = transactions.iter().map(|stx| stx.id()).collect();
    let positions: HashMap<Hash, usize> = ids
        .iter()
        .enumerate()
        .map(|(index, id)| (*id, index))
        .collect();

    // Forward edges: producer id to the batch positions that consume it,
    // in input order without duplicates.
    let mut dependents: HashMap<Hash, Vec<usize>> = HashMap::new();
    let mut edge_seen: HashSet<(Hash, usize)> = HashSet::new();
    for (index, stx) in transactions.iter().enumerate() {
        for input in &stx.transaction.inputs {
            if !positions.contains_key(&input.txhash) {
                continue;
            }
            if edge_seen.insert((input.txhash, index)) {
                dependents.entry(input.txhash).or_default().push(index);
            }
        }
    }

    // Iterative depth-first postorder over the forward graph; reversing the
    // postorder puts producers before consumers.
    let mut visited: HashSet<Hash> = HashSet::new();
    let mut postorder: Vec<usize> = Vec::with_capacity(transactions.len());
    for start in 0..transactions.len() {
        if !visited.insert(ids[start]) {
            continue;
        }
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        while let Some((node, cursor)) = stack.pop() {
            let children = dependents
                .get(&ids[node])
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            if cursor < children.len() {
                stack.push((node, cursor + 1));
                let child = children[cursor];
                if visited.insert(ids[child]) {
                    stack.push((child, 0));
                }
            } else {
                postorder.push(node);
            }
        }
    }
    postorder.reverse();

    // Distinct ids mean every node is visited exactly once; a shortfall
    // means the batch contained duplicates.
    if postorder.len() != transactions.len() {
        return Err(ResolveError::Internal(format!(
            "topological sort produced {} transactions from {}",
            postorder.len(),
            transactions.len()
        )));
    }

    let mut slots: Vec<Option<SignedTransaction>> =
        transactions.into_iter().map(Some).collect();
    postorder
        .into_iter()
        .map(|index| {
            slots[index]
                .take()
                .ok_or_else(|| ResolveError::Internal("duplicate id in sort input".into()))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
