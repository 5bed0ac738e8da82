//! Spool primitive types.
//!
//! Data model shared by the oracle engine, the chain adapter and the HTTP
//! API: validator statuses and their state machine, block classification
//! outcomes, the versioned beacon-block union and the decoded contract
//! events that drive subscriptions.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod beacon;
pub mod block;
pub mod events;
pub mod status;

pub use beacon::{
    BeaconValidator, BlsPublicKey, ProposerDuty, ValidatorLiveness, VersionedBeaconBlock,
};
pub use block::{BlockRecord, BlockType, Donation, RewardKind};
pub use events::{DonationEvent, SubscribeEvent, UnsubscribeEvent};
pub use status::{ValidatorEvent, ValidatorStatus};

/// Beacon-chain slot number.
pub type Slot = u64;

/// Beacon-chain epoch number.
pub type Epoch = u64;

/// Slots per epoch, fixed on Ethereum-style beacon chains.
pub const SLOTS_PER_EPOCH: u64 = 32;
