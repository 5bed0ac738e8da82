//! Chain access for the smoothing-pool oracle.
//!
//! Wraps a beacon node (REST) and an execution node (JSON-RPC via alloy)
//! behind the engine's [`ChainAdapter`] seam. Driver-facing calls retry with
//! backoff; API-facing calls try once and fail fast.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod beacon;
pub mod client;
pub mod execution;
pub mod retry;

pub use beacon::BeaconClient;
pub use client::ChainClient;
pub use execution::ExecutionClient;
pub use retry::RetryPolicy;
