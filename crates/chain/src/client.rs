//! The [`ChainAdapter`] implementation handed to the driver and the API.

use crate::{beacon::BeaconClient, execution::ExecutionClient, retry::RetryPolicy};
use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use spool_oracle::{ChainAdapter, ChainError, NodeStatus, PoolEvents};
use spool_primitives::{
    BeaconValidator, ProposerDuty, SLOTS_PER_EPOCH, Slot, VersionedBeaconBlock,
};
use std::time::Duration;
use tracing::info;
use url::Url;

/// Beacon node + execution node + pool contract, with per-call retry
/// policies: bounded backoff for the driver's calls, fail-fast for the
/// API's.
#[derive(Debug, Clone)]
pub struct ChainClient {
    beacon: BeaconClient,
    execution: ExecutionClient,
    driver_retry: RetryPolicy,
}

impl ChainClient {
    pub async fn connect(
        consensus_endpoint: Url,
        execution_endpoint: Url,
        pool_address: Address,
    ) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| ChainError::Transport(format!("http client: {err}")))?;
        let beacon = BeaconClient::new(consensus_endpoint, http);
        let execution = ExecutionClient::connect(&execution_endpoint, pool_address).await?;

        let client = Self {
            beacon,
            execution,
            driver_retry: RetryPolicy::driver(),
        };
        let chain_id = client.execution.chain_id().await?;
        info!(chain_id, %pool_address, "connected to consensus and execution nodes");
        Ok(client)
    }
}

#[async_trait]
impl ChainAdapter for ChainClient {
    async fn proposer_duty(&self, slot: Slot) -> Result<ProposerDuty, ChainError> {
        self.driver_retry
            .run("proposer_duty", || self.beacon.proposer_duty(slot))
            .await
    }

    async fn block_at_slot(&self, slot: Slot) -> Result<Option<VersionedBeaconBlock>, ChainError> {
        self.driver_retry
            .run("block_at_slot", || self.beacon.block_at_slot(slot))
            .await
    }

    async fn validator_by_index(&self, index: u64) -> Result<Option<BeaconValidator>, ChainError> {
        self.driver_retry
            .run("validator_by_index", || self.beacon.validator_by_index(index))
            .await
    }

    async fn finalized_slot(&self) -> Result<Slot, ChainError> {
        let epoch = self
            .driver_retry
            .run("finalized_epoch", || self.beacon.finalized_epoch())
            .await?;
        Ok(epoch * SLOTS_PER_EPOCH)
    }

    async fn head_block_number(&self) -> Result<u64, ChainError> {
        RetryPolicy::once()
            .run("head_block_number", || self.execution.head_block_number())
            .await
    }

    async fn pool_events(&self, from_block: u64, to_block: u64) -> Result<PoolEvents, ChainError> {
        self.driver_retry
            .run("pool_events", || self.execution.pool_events(from_block, to_block))
            .await
    }

    async fn vanilla_reward(&self, block_number: u64) -> Result<U256, ChainError> {
        self.driver_retry
            .run("vanilla_reward", || self.execution.vanilla_reward(block_number))
            .await
    }

    async fn node_status(&self) -> Result<NodeStatus, ChainError> {
        let once = RetryPolicy::once();
        let consensus_in_sync = once
            .run("consensus_syncing", || self.beacon.is_synced())
            .await?;
        let execution_in_sync = once
            .run("execution_syncing", || self.execution.is_synced())
            .await?;
        let execution_chain_id = once.run("chain_id", || self.execution.chain_id()).await?;
        let deposit_contract = once
            .run("deposit_contract", || self.beacon.deposit_contract())
            .await?;
        Ok(NodeStatus {
            consensus_in_sync,
            execution_in_sync,
            execution_chain_id,
            deposit_contract,
        })
    }

    async fn contract_rewards_root(&self) -> Result<B256, ChainError> {
        RetryPolicy::once()
            .run("rewards_root", || self.execution.rewards_root())
            .await
    }

    async fn claimed_balance(&self, address: Address) -> Result<U256, ChainError> {
        RetryPolicy::once()
            .run("claimed_balance", || self.execution.claimed_balance(address))
            .await
    }
}
