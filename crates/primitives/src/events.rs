use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// A decoded `SubscribeValidator` contract event.
///
/// Ordering inside a block follows `log_index`; across blocks,
/// `block_number`. The chain adapter emits events already sorted that way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeEvent {
    pub validator_index: u64,
    pub sender: Address,
    pub collateral_wei: U256,
    pub block_number: u64,
    pub log_index: u64,
}

/// A decoded `UnsubscribeValidator` contract event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsubscribeEvent {
    pub validator_index: u64,
    pub sender: Address,
    pub block_number: u64,
    pub log_index: u64,
}

/// A decoded `EtherReceived` contract event (a donation to the pool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationEvent {
    pub sender: Address,
    pub amount_wei: U256,
    pub block_number: u64,
    pub log_index: u64,
}
