//! Observational persistence seam.
//!
//! A sink mirrors `(validators, blocks, rewards)` for dashboards; the oracle
//! never reads it back and may reset it at startup. The shipped
//! implementation keeps everything in the log.

use crate::state::OracleState;
use async_trait::async_trait;
use tracing::debug;

#[async_trait]
pub trait StateSink: Send + Sync {
    /// Drops any previously mirrored data. Called once at startup; resuming
    /// mid-checkpoint is not supported, so stale mirrors are useless.
    async fn reset(&self);

    /// Mirrors the state after a checkpoint.
    async fn mirror(&self, state: &OracleState);
}

/// Sink that mirrors nothing.
#[derive(Debug, Clone, Default)]
pub struct NullSink;

#[async_trait]
impl StateSink for NullSink {
    async fn reset(&self) {}

    async fn mirror(&self, state: &OracleState) {
        debug!(
            validators = state.validators.len(),
            proposed = state.proposed_blocks.len(),
            "state mirror skipped (no sink configured)"
        );
    }
}
