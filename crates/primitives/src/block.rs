use crate::{BlsPublicKey, Slot};
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Outcome of classifying one slot's proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    /// No block exists for the slot.
    MissedProposal,
    /// Block exists and the reward was credited to the pool.
    OkPoolProposal,
    /// Reward went to the pool but the proposer's withdrawal credentials are
    /// BLS, so there is no address to credit; the reward goes to pool fees.
    OkPoolProposalBlsKeys,
    /// Block exists but the reward was sent somewhere else.
    WrongFeeRecipient,
}

/// How the pool was paid for a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    /// The block's fee-recipient field pointed at the pool; the reward is
    /// the sum of priority fees.
    Vanilla,
    /// A builder payment: the final transaction in the block transfers value
    /// to the pool.
    Mev,
}

/// One classified proposal, as stored in the oracle's append-only block
/// collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub slot: Slot,
    /// Execution block number; absent for missed proposals.
    pub block_number: Option<u64>,
    pub validator_index: u64,
    pub validator_key: BlsPublicKey,
    pub block_type: BlockType,
    pub reward_wei: U256,
    pub reward_kind: Option<RewardKind>,
}

/// A plain transfer received by the pool contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donation {
    pub sender: Address,
    pub amount_wei: U256,
    pub block_number: u64,
}
