//! Checkpoint Merkleization.
//!
//! Leaves are `(withdrawal_address, accumulated_balance)` pairs aggregated
//! per address, plus the synthetic pool-fees leaf, sorted by address bytes.
//! A leaf digest is `keccak256(abi.encode(address, balance))`; an internal
//! node is `keccak256(left || right)`. Odd nodes are carried up unchanged.

use crate::state::{CommittedState, OracleState};
use alloy_primitives::{Address, B256, U256, keccak256};
use alloy_sol_types::SolValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One pre-hash Merkle leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLeaf {
    pub withdrawal_address: Address,
    pub accumulated_balance: U256,
}

/// Digest of a leaf as the verifying contract computes it.
pub fn hash_leaf(leaf: &RawLeaf) -> B256 {
    keccak256((leaf.withdrawal_address, leaf.accumulated_balance).abi_encode())
}

/// Aggregates the state into ordered raw leaves: one per distinct
/// withdrawal address (balances summed across validator indices) plus the
/// pool-fees leaf. `BTreeMap` ordering gives the byte-lexicographic leaf
/// order the contract expects.
pub fn aggregate_leaves(state: &OracleState) -> Vec<RawLeaf> {
    let mut by_address: BTreeMap<Address, U256> = BTreeMap::new();
    by_address.insert(state.pool_fees_address, state.pool_accumulated_fees_wei);

    for validator in state.validators.values() {
        let Some(address) = validator.withdrawal_address else {
            continue;
        };
        *by_address.entry(address).or_insert(U256::ZERO) += validator.accumulated_rewards_wei;
    }

    by_address
        .into_iter()
        .map(|(withdrawal_address, accumulated_balance)| RawLeaf {
            withdrawal_address,
            accumulated_balance,
        })
        .collect()
}

/// Binary Merkle tree over leaf digests, all levels retained so inclusion
/// proofs can be read off directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    levels: Vec<Vec<B256>>,
}

impl MerkleTree {
    pub fn from_leaves(leaves: Vec<B256>) -> Self {
        if leaves.is_empty() {
            return Self { levels: Vec::new() };
        }

        let mut levels = vec![leaves];
        while levels.last().expect("levels is non-empty").len() > 1 {
            let current = levels.last().expect("levels is non-empty");
            let mut next = Vec::with_capacity(current.len().div_ceil(2));
            for pair in current.chunks(2) {
                match pair {
                    [left, right] => {
                        let mut buf = [0u8; 64];
                        buf[..32].copy_from_slice(left.as_slice());
                        buf[32..].copy_from_slice(right.as_slice());
                        next.push(keccak256(buf));
                    }
                    // Odd count: the node is carried to the next level.
                    [lone] => next.push(*lone),
                    _ => unreachable!("chunks(2) yields one- or two-element slices"),
                }
            }
            levels.push(next);
        }
        Self { levels }
    }

    /// Root of the tree; the all-zeros value for an empty tree.
    pub fn root(&self) -> B256 {
        self.levels
            .last()
            .and_then(|top| top.first())
            .copied()
            .unwrap_or(B256::ZERO)
    }

    pub fn leaf_count(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    /// Inclusion proof for the leaf at `index`: the sibling path ordered
    /// root-first, leaf-last, as the verifying contract consumes it.
    /// Carried-up nodes contribute no sibling.
    pub fn proof(&self, index: usize) -> Option<Vec<B256>> {
        if index >= self.leaf_count() {
            return None;
        }

        let mut siblings = Vec::new();
        let mut position = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = position ^ 1;
            if sibling < level.len() {
                siblings.push(level[sibling]);
            }
            position /= 2;
        }
        siblings.reverse();
        Some(siblings)
    }
}

/// Verifies a root-first inclusion proof for the leaf digest at `index` in
/// a tree of `leaf_count` leaves.
pub fn verify_proof(
    root: B256,
    leaf_hash: B256,
    index: usize,
    leaf_count: usize,
    proof: &[B256],
) -> bool {
    if index >= leaf_count || leaf_count == 0 {
        return false;
    }

    let mut node = leaf_hash;
    let mut position = index;
    let mut width = leaf_count;
    // The proof is root-first; consume it from the leaf end.
    let mut siblings = proof.iter().rev();

    while width > 1 {
        let sibling_position = position ^ 1;
        if sibling_position < width {
            let Some(sibling) = siblings.next() else {
                return false;
            };
            let mut buf = [0u8; 64];
            if position % 2 == 0 {
                buf[..32].copy_from_slice(node.as_slice());
                buf[32..].copy_from_slice(sibling.as_slice());
            } else {
                buf[..32].copy_from_slice(sibling.as_slice());
                buf[32..].copy_from_slice(node.as_slice());
            }
            node = keccak256(buf);
        }
        position /= 2;
        width = width.div_ceil(2);
    }

    siblings.next().is_none() && node == root
}

impl OracleState {
    /// Snapshots the current balances into a [`CommittedState`]: aggregated
    /// leaves, tree, root and one proof per address.
    pub fn build_committed_state(&self) -> CommittedState {
        let raw_leaves = aggregate_leaves(self);
        let digests: Vec<B256> = raw_leaves.iter().map(hash_leaf).collect();
        let tree = MerkleTree::from_leaves(digests);

        let mut leaves_by_address = BTreeMap::new();
        let mut proofs_by_address = BTreeMap::new();
        for (index, leaf) in raw_leaves.iter().enumerate() {
            leaves_by_address.insert(leaf.withdrawal_address, leaf.clone());
            let proof = tree
                .proof(index)
                .expect("every aggregated leaf is in the tree");
            proofs_by_address.insert(leaf.withdrawal_address, proof);
        }

        CommittedState {
            slot: self.latest_processed_slot,
            merkle_root: tree.root(),
            raw_leaves,
            leaves_by_address,
            proofs_by_address,
            validators: self.validators.clone(),
        }
    }

    /// Builds and stores the checkpoint snapshot, returning the root to
    /// publish.
    pub fn commit_checkpoint(&mut self) -> B256 {
        let committed = self.build_committed_state();
        let root = committed.merkle_root;
        self.latest_committed_state = Some(committed);
        root
    }
}
