//! The seam between the engine and the consensus/execution nodes.
//!
//! The driver and the API only ever talk to a [`ChainAdapter`]; the concrete
//! client lives in `spool-chain`. Driver-facing calls are expected to retry
//! with backoff internally, API-facing calls to try once and fail fast.

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use spool_primitives::{
    BeaconValidator, DonationEvent, ProposerDuty, Slot, SubscribeEvent, UnsubscribeEvent,
    VersionedBeaconBlock,
};

/// Errors produced by chain-adapter implementations.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// The node is unreachable or timed out; retryable.
    #[error("transport: {0}")]
    Transport(String),

    /// The node answered but is still syncing; retryable.
    #[error("node not synced: {0}")]
    NotSynced(String),

    /// The node returned something the adapter could not decode.
    #[error("decode: {0}")]
    Decode(String),

    /// Data that must exist is missing (e.g. proposer not in the registry).
    #[error("missing data: {0}")]
    Missing(String),
}

impl ChainError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::NotSynced(_))
    }
}

/// Contract events observed in a block range, each list ordered by
/// `(block_number, log_index)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolEvents {
    pub subscriptions: Vec<SubscribeEvent>,
    pub unsubscriptions: Vec<UnsubscribeEvent>,
    pub donations: Vec<DonationEvent>,
}

/// A subscription or unsubscription, merged into one stream for replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipEvent {
    Subscribe(SubscribeEvent),
    Unsubscribe(UnsubscribeEvent),
}

impl MembershipEvent {
    pub fn ordering_key(&self) -> (u64, u64) {
        match self {
            Self::Subscribe(e) => (e.block_number, e.log_index),
            Self::Unsubscribe(e) => (e.block_number, e.log_index),
        }
    }

    pub fn validator_index(&self) -> u64 {
        match self {
            Self::Subscribe(e) => e.validator_index,
            Self::Unsubscribe(e) => e.validator_index,
        }
    }
}

impl PoolEvents {
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
            && self.unsubscriptions.is_empty()
            && self.donations.is_empty()
    }

    /// Subscriptions and unsubscriptions merged into strict
    /// `(block_number, log_index)` order, as the overlay replays them.
    pub fn membership_ordered(&self) -> Vec<MembershipEvent> {
        let mut merged: Vec<MembershipEvent> = self
            .subscriptions
            .iter()
            .cloned()
            .map(MembershipEvent::Subscribe)
            .chain(
                self.unsubscriptions
                    .iter()
                    .cloned()
                    .map(MembershipEvent::Unsubscribe),
            )
            .collect();
        merged.sort_by_key(|event| event.ordering_key());
        merged
    }
}

/// Health of the upstream nodes, as reported to `/status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatus {
    pub consensus_in_sync: bool,
    pub execution_in_sync: bool,
    pub execution_chain_id: u64,
    pub deposit_contract: String,
}

/// Everything the oracle needs from the beacon node, the execution node and
/// the pool contract.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    /// The validator expected to propose at `slot`.
    async fn proposer_duty(&self, slot: Slot) -> Result<ProposerDuty, ChainError>;

    /// The block at `slot`, or `None` for a missed proposal.
    async fn block_at_slot(&self, slot: Slot) -> Result<Option<VersionedBeaconBlock>, ChainError>;

    /// Registry entry for a validator index, `None` if unknown to the chain.
    async fn validator_by_index(&self, index: u64) -> Result<Option<BeaconValidator>, ChainError>;

    /// First slot of the latest finalized epoch.
    async fn finalized_slot(&self) -> Result<Slot, ChainError>;

    /// Latest execution block number at head (non-finalized).
    async fn head_block_number(&self) -> Result<u64, ChainError>;

    /// Pool-contract events in the inclusive execution-block range.
    async fn pool_events(&self, from_block: u64, to_block: u64) -> Result<PoolEvents, ChainError>;

    /// Proposer reward of a block paid through the fee-recipient path:
    /// the sum of priority fees over the block's receipts.
    async fn vanilla_reward(&self, block_number: u64) -> Result<U256, ChainError>;

    /// Sync state of both nodes plus chain identity, for `/status`.
    async fn node_status(&self) -> Result<NodeStatus, ChainError>;

    /// The rewards root currently stored in the pool contract.
    async fn contract_rewards_root(&self) -> Result<B256, ChainError>;

    /// Wei already claimed by a withdrawal address, from the contract.
    async fn claimed_balance(&self, address: Address) -> Result<U256, ChainError>;
}
