use crate::{config::OracleConfig, merkle::RawLeaf};
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use spool_primitives::{
    BlockRecord, BlsPublicKey, Donation, Slot, ValidatorEvent, ValidatorStatus,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The oracle state behind the single reader-writer lock. The driver is the
/// only writer; API handlers clone what they need and release.
pub type SharedState = Arc<RwLock<OracleState>>;

/// Everything the oracle tracks about one validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorInfo {
    pub validator_index: u64,
    pub validator_key: BlsPublicKey,
    /// Execution-layer address rewards are claimable from. `None` only while
    /// the validator is `Untracked`.
    pub withdrawal_address: Option<Address>,
    pub status: ValidatorStatus,
    pub pending_rewards_wei: U256,
    pub accumulated_rewards_wei: U256,
    pub collateral_wei: U256,
    pub proposed_blocks_slots: Vec<Slot>,
    pub missed_blocks_slots: Vec<Slot>,
    pub wrong_fee_blocks_slots: Vec<Slot>,
}

impl ValidatorInfo {
    pub fn new(validator_index: u64, validator_key: BlsPublicKey) -> Self {
        Self {
            validator_index,
            validator_key,
            withdrawal_address: None,
            status: ValidatorStatus::Untracked,
            pending_rewards_wei: U256::ZERO,
            accumulated_rewards_wei: U256::ZERO,
            collateral_wei: U256::ZERO,
            proposed_blocks_slots: Vec::new(),
            missed_blocks_slots: Vec::new(),
            wrong_fee_blocks_slots: Vec::new(),
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.status.is_subscribed()
    }
}

/// Snapshot taken at a checkpoint: the leaves, the proofs and the validator
/// set the committed root was computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedState {
    pub slot: Slot,
    pub merkle_root: B256,
    pub raw_leaves: Vec<RawLeaf>,
    pub leaves_by_address: BTreeMap<Address, RawLeaf>,
    pub proofs_by_address: BTreeMap<Address, Vec<B256>>,
    pub validators: BTreeMap<u64, ValidatorInfo>,
}

/// The replayed pool state. Mutated only by the driver, one finalized slot
/// at a time; see the ledger and subscription impls for the transition
/// rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleState {
    pub validators: BTreeMap<u64, ValidatorInfo>,
    pub pool_accumulated_fees_wei: U256,
    pub pool_fees_percent: u8,
    pub pool_fees_address: Address,
    pub latest_processed_slot: Slot,
    pub latest_processed_block: u64,
    pub proposed_blocks: Vec<BlockRecord>,
    pub missed_blocks: Vec<BlockRecord>,
    pub wrong_fee_blocks: Vec<BlockRecord>,
    pub donations: Vec<Donation>,
    pub latest_committed_state: Option<CommittedState>,
}

impl OracleState {
    /// Fresh state positioned at the contract's deployment slot.
    pub fn new(config: &OracleConfig) -> Self {
        Self {
            validators: BTreeMap::new(),
            pool_accumulated_fees_wei: U256::ZERO,
            pool_fees_percent: config.pool_fees_percent,
            pool_fees_address: config.pool_fees_address,
            latest_processed_slot: config.deployed_slot,
            latest_processed_block: 0,
            proposed_blocks: Vec::new(),
            missed_blocks: Vec::new(),
            wrong_fee_blocks: Vec::new(),
            donations: Vec::new(),
            latest_committed_state: None,
        }
    }

    /// Indices of validators currently earning a reward share.
    pub fn subscribed_indices(&self) -> Vec<u64> {
        self.validators
            .iter()
            .filter(|(_, v)| v.is_subscribed())
            .map(|(index, _)| *index)
            .collect()
    }

    /// Applies a state-machine event to a tracked validator. A no-op for
    /// indices the oracle has never seen.
    pub fn fire(&mut self, validator_index: u64, event: ValidatorEvent) {
        if let Some(validator) = self.validators.get_mut(&validator_index) {
            let from = validator.status;
            validator.status = from.advance(event);
            if from != validator.status {
                tracing::debug!(
                    validator = validator_index,
                    ?from,
                    to = ?validator.status,
                    ?event,
                    "status transition"
                );
            }
        }
    }

    /// Record for `validator_index`, created `Untracked` if absent.
    pub fn validator_entry(
        &mut self,
        validator_index: u64,
        validator_key: BlsPublicKey,
    ) -> &mut ValidatorInfo {
        self.validators
            .entry(validator_index)
            .or_insert_with(|| ValidatorInfo::new(validator_index, validator_key))
    }
}
