//! The smoothing-pool oracle engine.
//!
//! Consumes a finalized-only stream of beacon blocks and pool-contract
//! events, advances a per-validator state machine, accrues rewards, and
//! commits a Merkle root of claimable balances at every checkpoint. All
//! mutation goes through [`Driver`], the single writer; readers work on
//! copies (see [`overlay`]).

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod adapter;
pub mod classify;
pub mod config;
pub mod driver;
pub mod error;
pub mod merkle;
pub mod overlay;
pub mod publisher;
pub mod sink;
pub mod state;

mod ledger;
mod subscriptions;

pub use adapter::{ChainAdapter, ChainError, MembershipEvent, NodeStatus, PoolEvents};
pub use classify::{Classification, classify_block};
pub use config::OracleConfig;
pub use driver::{Driver, SlotBundle, apply_slot};
pub use error::{ErrorKind, OracleError};
pub use merkle::{MerkleTree, RawLeaf, hash_leaf, verify_proof};
pub use overlay::overlay_validators;
pub use publisher::{DryRunPublisher, RootPublisher};
pub use sink::{NullSink, StateSink};
pub use state::{CommittedState, OracleState, SharedState, ValidatorInfo};
