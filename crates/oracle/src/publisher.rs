//! Checkpoint root publication seam.
//!
//! The transaction that writes the root on-chain is an external
//! collaborator; the engine only knows this trait. The shipped
//! implementation logs and skips, which is also the `--dry-run` behavior.

use crate::error::OracleError;
use alloy_primitives::B256;
use async_trait::async_trait;
use spool_primitives::Slot;
use tracing::info;

#[async_trait]
pub trait RootPublisher: Send + Sync {
    /// Hands a freshly committed checkpoint root to the on-chain writer.
    async fn publish_root(&self, slot: Slot, root: B256) -> Result<(), OracleError>;
}

/// Publisher that records the root in the log without touching the chain.
#[derive(Debug, Clone, Default)]
pub struct DryRunPublisher;

#[async_trait]
impl RootPublisher for DryRunPublisher {
    async fn publish_root(&self, slot: Slot, root: B256) -> Result<(), OracleError> {
        info!(slot, %root, "dry run: skipping on-chain root update");
        Ok(())
    }
}
