//! Per-slot block classification.
//!
//! Decides whether a slot was missed, paid the pool (vanilla or MEV), or
//! sent the reward elsewhere. Pure: the adapter supplies the block and the
//! receipt-derived vanilla reward, classification itself never does I/O.

use alloy_consensus::{Transaction, TxEnvelope};
use alloy_eips::eip2718::Decodable2718;
use alloy_primitives::{Address, U256};
use spool_primitives::{BeaconValidator, BlockType, RewardKind, VersionedBeaconBlock};

/// Outcome of classifying one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub block_type: BlockType,
    /// Wei credited to the pool by this block; for `WrongFeeRecipient` the
    /// amount that was diverted instead.
    pub reward_wei: U256,
    pub reward_kind: Option<RewardKind>,
}

/// Classifies the proposal at a slot.
///
/// MEV detection looks only at the final transaction of the block: builders
/// append the payment to the fee recipient last. Everything else reaching
/// the pool mid-block arrives through the contract's `EtherReceived` path
/// and is accounted as a donation, not a proposal reward.
pub fn classify_block(
    block: Option<&VersionedBeaconBlock>,
    proposer: &BeaconValidator,
    pool_address: Address,
    vanilla_reward_wei: U256,
) -> Classification {
    let Some(block) = block else {
        return Classification {
            block_type: BlockType::MissedProposal,
            reward_wei: U256::ZERO,
            reward_kind: None,
        };
    };

    let mev_payment = final_payment_to(block, pool_address);
    let (reward_wei, reward_kind) = match mev_payment {
        Some(value) => (value, Some(RewardKind::Mev)),
        None if block.fee_recipient() == pool_address => {
            (vanilla_reward_wei, Some(RewardKind::Vanilla))
        }
        None => (vanilla_reward_wei, None),
    };

    let block_type = match reward_kind {
        Some(_) if proposer.has_bls_credentials() => BlockType::OkPoolProposalBlsKeys,
        Some(_) => BlockType::OkPoolProposal,
        None => BlockType::WrongFeeRecipient,
    };

    Classification {
        block_type,
        reward_wei,
        reward_kind,
    }
}

/// Value transferred to `recipient` by the last transaction of the block,
/// if any.
fn final_payment_to(block: &VersionedBeaconBlock, recipient: Address) -> Option<U256> {
    let raw = block.transactions().last()?;
    let envelope = TxEnvelope::decode_2718(&mut raw.as_ref()).ok()?;
    if envelope.to() == Some(recipient) && !envelope.value().is_zero() {
        Some(envelope.value())
    } else {
        None
    }
}
