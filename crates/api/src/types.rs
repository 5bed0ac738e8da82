//! Response payloads and the pure builders the handlers delegate to.

use alloy_primitives::{B256, U256};
use serde::Serialize;
use spool_oracle::{NodeStatus, OracleConfig, OracleState};
use spool_primitives::{Slot, ValidatorStatus};

/// Head distance (in slots) under which the oracle reports itself in sync.
const ORACLE_SYNC_TOLERANCE_SLOTS: u64 = 32;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub is_consensus_in_sync: bool,
    pub is_execution_in_sync: bool,
    pub is_oracle_in_sync: bool,
    pub latest_processed_slot: Slot,
    pub latest_processed_block: u64,
    pub latest_finalized_slot: Slot,
    pub oracle_head_distance: u64,
    pub next_checkpoint_slot: Slot,
    pub previous_checkpoint_slot: Option<Slot>,
    pub execution_chain_id: u64,
    pub network: String,
    pub deposit_contract: String,
}

pub fn build_status(
    state: &OracleState,
    config: &OracleConfig,
    nodes: &NodeStatus,
    finalized_slot: Slot,
) -> StatusResponse {
    let processed = state.latest_processed_slot;
    let distance = finalized_slot.saturating_sub(processed);
    let size = config.checkpoint_size_in_slots;
    let next_checkpoint_slot =
        config.deployed_slot + ((processed - config.deployed_slot) / size + 1) * size;

    StatusResponse {
        is_consensus_in_sync: nodes.consensus_in_sync,
        is_execution_in_sync: nodes.execution_in_sync,
        is_oracle_in_sync: distance <= ORACLE_SYNC_TOLERANCE_SLOTS,
        latest_processed_slot: processed,
        latest_processed_block: state.latest_processed_block,
        latest_finalized_slot: finalized_slot,
        oracle_head_distance: distance,
        next_checkpoint_slot,
        previous_checkpoint_slot: state.latest_committed_state.as_ref().map(|c| c.slot),
        execution_chain_id: nodes.execution_chain_id,
        network: config.network.clone(),
        deposit_contract: nodes.deposit_contract.clone(),
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StatisticsResponse {
    pub total_subscribed_validators: u64,
    pub total_active_validators: u64,
    pub total_yellowcard_validators: u64,
    pub total_redcard_validators: u64,
    pub total_banned_validators: u64,
    pub total_notsubscribed_validators: u64,
    pub total_accumulated_rewards_wei: U256,
    pub total_pending_rewards_wei: U256,
    pub total_rewards_sent_wei: U256,
    pub total_donations_wei: U256,
    pub avg_block_reward_wei: U256,
    pub total_proposed_blocks: u64,
    pub total_missed_blocks: u64,
    pub total_wrongfee_blocks: u64,
    pub latest_checkpoint_slot: Option<Slot>,
    pub next_checkpoint_slot: Slot,
}

pub fn build_statistics(state: &OracleState, config: &OracleConfig) -> StatisticsResponse {
    let mut active = 0u64;
    let mut yellow = 0u64;
    let mut red = 0u64;
    let mut banned = 0u64;
    let mut not_subscribed = 0u64;
    let mut accumulated = U256::ZERO;
    let mut pending = U256::ZERO;

    for validator in state.validators.values() {
        match validator.status {
            ValidatorStatus::Active => active += 1,
            ValidatorStatus::YellowCard => yellow += 1,
            ValidatorStatus::RedCard => red += 1,
            ValidatorStatus::Banned => banned += 1,
            ValidatorStatus::NotSubscribed => not_subscribed += 1,
            ValidatorStatus::Untracked => {}
        }
        accumulated += validator.accumulated_rewards_wei;
        pending += validator.pending_rewards_wei;
    }

    let rewards_sent = state
        .proposed_blocks
        .iter()
        .map(|block| block.reward_wei)
        .fold(U256::ZERO, |acc, x| acc + x);
    let donations = state
        .donations
        .iter()
        .map(|donation| donation.amount_wei)
        .fold(U256::ZERO, |acc, x| acc + x);

    let total_proposed = state.proposed_blocks.len() as u64;
    let avg_block_reward = if total_proposed == 0 {
        U256::ZERO
    } else {
        rewards_sent / U256::from(total_proposed)
    };

    let size = config.checkpoint_size_in_slots;
    let next_checkpoint_slot = config.deployed_slot
        + ((state.latest_processed_slot - config.deployed_slot) / size + 1) * size;

    StatisticsResponse {
        total_subscribed_validators: active + yellow + red,
        total_active_validators: active,
        total_yellowcard_validators: yellow,
        total_redcard_validators: red,
        total_banned_validators: banned,
        total_notsubscribed_validators: not_subscribed,
        total_accumulated_rewards_wei: accumulated,
        total_pending_rewards_wei: pending,
        total_rewards_sent_wei: rewards_sent,
        total_donations_wei: donations,
        avg_block_reward_wei: avg_block_reward,
        total_proposed_blocks: total_proposed,
        total_missed_blocks: state.missed_blocks.len() as u64,
        total_wrongfee_blocks: state.wrong_fee_blocks.len() as u64,
        latest_checkpoint_slot: state.latest_committed_state.as_ref().map(|c| c.slot),
        next_checkpoint_slot,
    }
}

#[derive(Debug, Serialize)]
pub struct FeesInfoResponse {
    pub pool_fee_percent: u8,
    pub pool_fee_address: String,
    pub pool_accumulated_fees_wei: U256,
}

#[derive(Debug, Serialize)]
pub struct MerkleRootResponse {
    pub merkle_root: B256,
}

#[derive(Debug, Serialize)]
pub struct CheckpointResponse {
    pub merkle_root: B256,
    pub checkpoint_slot: Slot,
}

#[derive(Debug, Serialize)]
pub struct ProofResponse {
    pub leaf_withdrawal_address: String,
    pub leaf_accumulated_balance: U256,
    pub merkle_root: B256,
    pub checkpoint_slot: Slot,
    pub merkle_proofs: Vec<B256>,
    pub registered_validators: Vec<u64>,
    pub claimed_wei: U256,
    pub claimable_wei: U256,
    pub pending_wei: U256,
}
