//! Execution-node client: provider queries, pool-contract reads and event
//! log fetching.

use alloy::{
    eips::BlockNumberOrTag,
    primitives::{Address, B256, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::{Filter, Log, SyncStatus},
    sol_types::SolEvent,
};
use spool_contracts::ISmoothingPool;
use spool_oracle::{ChainError, PoolEvents};
use spool_primitives::{DonationEvent, SubscribeEvent, UnsubscribeEvent};
use tracing::debug;
use url::Url;

#[derive(Debug, Clone)]
pub struct ExecutionClient {
    provider: DynProvider,
    pool_address: Address,
}

impl ExecutionClient {
    pub async fn connect(endpoint: &Url, pool_address: Address) -> Result<Self, ChainError> {
        let provider = ProviderBuilder::new()
            .connect(endpoint.as_str())
            .await
            .map_err(|err| ChainError::Transport(format!("execution connect: {err}")))?
            .erased();
        Ok(Self {
            provider,
            pool_address,
        })
    }

    pub async fn head_block_number(&self) -> Result<u64, ChainError> {
        self.provider
            .get_block_number()
            .await
            .map_err(transport("block number"))
    }

    pub async fn chain_id(&self) -> Result<u64, ChainError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(transport("chain id"))
    }

    pub async fn is_synced(&self) -> Result<bool, ChainError> {
        let status = self
            .provider
            .syncing()
            .await
            .map_err(transport("sync progress"))?;
        Ok(matches!(status, SyncStatus::None))
    }

    /// Sum of priority fees over a block's receipts: the reward the
    /// fee-recipient earns when no builder payment is involved.
    pub async fn vanilla_reward(&self, block_number: u64) -> Result<U256, ChainError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(block_number))
            .await
            .map_err(transport("block by number"))?
            .ok_or_else(|| ChainError::Missing(format!("execution block {block_number}")))?;
        let base_fee = block.header.base_fee_per_gas.unwrap_or_default() as u128;

        let receipts = self
            .provider
            .get_block_receipts(block_number.into())
            .await
            .map_err(transport("block receipts"))?
            .ok_or_else(|| ChainError::Missing(format!("receipts for block {block_number}")))?;

        let mut reward = U256::ZERO;
        for receipt in receipts {
            let tip = receipt.effective_gas_price.saturating_sub(base_fee);
            reward += U256::from(receipt.gas_used as u128 * tip);
        }
        debug!(block_number, %reward, "computed vanilla block reward");
        Ok(reward)
    }

    /// All pool-contract events in the inclusive block range, each list
    /// ordered by `(block_number, log_index)`.
    pub async fn pool_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<PoolEvents, ChainError> {
        let mut events = PoolEvents::default();

        for log in self
            .logs_for(ISmoothingPool::SubscribeValidator::SIGNATURE_HASH, from_block, to_block)
            .await?
        {
            let decoded = log
                .log_decode::<ISmoothingPool::SubscribeValidator>()
                .map_err(|err| ChainError::Decode(format!("SubscribeValidator log: {err}")))?;
            let (block_number, log_index) = log_position(&log)?;
            events.subscriptions.push(SubscribeEvent {
                validator_index: decoded.inner.data.validatorId,
                sender: decoded.inner.data.sender,
                collateral_wei: decoded.inner.data.subscriptionCollateral,
                block_number,
                log_index,
            });
        }

        for log in self
            .logs_for(ISmoothingPool::UnsubscribeValidator::SIGNATURE_HASH, from_block, to_block)
            .await?
        {
            let decoded = log
                .log_decode::<ISmoothingPool::UnsubscribeValidator>()
                .map_err(|err| ChainError::Decode(format!("UnsubscribeValidator log: {err}")))?;
            let (block_number, log_index) = log_position(&log)?;
            events.unsubscriptions.push(UnsubscribeEvent {
                validator_index: decoded.inner.data.validatorId,
                sender: decoded.inner.data.sender,
                block_number,
                log_index,
            });
        }

        for log in self
            .logs_for(ISmoothingPool::EtherReceived::SIGNATURE_HASH, from_block, to_block)
            .await?
        {
            let decoded = log
                .log_decode::<ISmoothingPool::EtherReceived>()
                .map_err(|err| ChainError::Decode(format!("EtherReceived log: {err}")))?;
            let (block_number, log_index) = log_position(&log)?;
            events.donations.push(DonationEvent {
                sender: decoded.inner.data.sender,
                amount_wei: decoded.inner.data.donationAmount,
                block_number,
                log_index,
            });
        }

        events
            .subscriptions
            .sort_by_key(|e| (e.block_number, e.log_index));
        events
            .unsubscriptions
            .sort_by_key(|e| (e.block_number, e.log_index));
        events
            .donations
            .sort_by_key(|e| (e.block_number, e.log_index));
        Ok(events)
    }

    async fn logs_for(
        &self,
        signature: B256,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Log>, ChainError> {
        let filter = Filter::new()
            .address(self.pool_address)
            .event_signature(signature)
            .from_block(from_block)
            .to_block(to_block);
        self.provider
            .get_logs(&filter)
            .await
            .map_err(transport("event logs"))
    }

    pub async fn rewards_root(&self) -> Result<B256, ChainError> {
        let pool = ISmoothingPool::new(self.pool_address, &self.provider);
        pool.rewardsRoot()
            .call()
            .await
            .map_err(|err| ChainError::Transport(format!("rewardsRoot: {err}")))
    }

    pub async fn claimed_balance(&self, address: Address) -> Result<U256, ChainError> {
        let pool = ISmoothingPool::new(self.pool_address, &self.provider);
        pool.claimedBalance(address)
            .call()
            .await
            .map_err(|err| ChainError::Transport(format!("claimedBalance: {err}")))
    }
}

fn transport(what: &'static str) -> impl Fn(alloy::transports::RpcError<alloy::transports::TransportErrorKind>) -> ChainError {
    move |err| ChainError::Transport(format!("{what}: {err}"))
}

fn log_position(log: &Log) -> Result<(u64, u64), ChainError> {
    let block_number = log
        .block_number
        .ok_or_else(|| ChainError::Decode("log without block number".into()))?;
    let log_index = log
        .log_index
        .ok_or_else(|| ChainError::Decode("log without index".into()))?;
    Ok((block_number, log_index))
}
