//! The oracle driver: the single writer advancing finalized state one slot
//! at a time and committing checkpoints.
//!
//! The per-slot transition itself ([`apply_slot`]) is pure; the driver only
//! wraps it with fetching, locking, retry and checkpoint bookkeeping. Within
//! a slot the order is fixed: subscriptions, proposal handling,
//! unsubscriptions, donations. Subscriptions go first so a validator joining
//! in a block shares that block's reward; unsubscriptions go last so a
//! departing validator is still paid for it.

use crate::{
    adapter::{ChainAdapter, ChainError, PoolEvents},
    classify::classify_block,
    config::OracleConfig,
    error::{ErrorKind, OracleError},
    publisher::RootPublisher,
    sink::StateSink,
    state::{OracleState, SharedState},
};
use alloy_primitives::U256;
use metrics::{counter, gauge};
use spool_primitives::{
    BeaconValidator, BlockRecord, BlockType, ProposerDuty, Slot, ValidatorEvent,
    VersionedBeaconBlock,
};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

/// Delay between retries when a node is behind or unreachable.
const RETRY_DELAY: Duration = Duration::from_secs(15);

/// Everything fetched for one slot, handed to the pure transition.
#[derive(Debug, Clone)]
pub struct SlotBundle {
    pub slot: Slot,
    pub duty: ProposerDuty,
    pub block: Option<VersionedBeaconBlock>,
    /// Registry entry of the proposer; required whenever `block` is present.
    pub proposer: Option<BeaconValidator>,
    /// Registry entries for validators referenced by subscription events.
    pub registry: BTreeMap<u64, BeaconValidator>,
    pub events: PoolEvents,
    pub vanilla_reward_wei: U256,
}

/// Applies one finalized slot to the state. Deterministic: replaying the
/// same bundle on a copy of the initial state produces the same result.
pub fn apply_slot(
    state: &mut OracleState,
    config: &OracleConfig,
    bundle: &SlotBundle,
) -> Result<(), OracleError> {
    if let Some(block) = &bundle.block {
        if block.slot() != bundle.slot {
            return Err(OracleError::SlotMismatch {
                expected: bundle.slot,
                got: block.slot(),
            });
        }
        if block.proposer_index() != bundle.duty.validator_index {
            return Err(OracleError::ProposerMismatch {
                slot: bundle.slot,
                duty: bundle.duty.validator_index,
                block: block.proposer_index(),
            });
        }
    }

    // Subscriptions first: a validator joining in this block participates in
    // this slot's reward split.
    for event in &bundle.events.subscriptions {
        state.apply_subscription(
            event,
            bundle.registry.get(&event.validator_index),
            config.collateral_wei,
        );
    }

    match &bundle.block {
        None => {
            let proposer_index = bundle.duty.validator_index;
            let subscribed = state
                .validators
                .get(&proposer_index)
                .is_some_and(|v| v.is_subscribed());
            if subscribed {
                state.missed_blocks.push(BlockRecord {
                    slot: bundle.slot,
                    block_number: None,
                    validator_index: proposer_index,
                    validator_key: bundle.duty.pubkey,
                    block_type: BlockType::MissedProposal,
                    reward_wei: U256::ZERO,
                    reward_kind: None,
                });
                if let Some(validator) = state.validators.get_mut(&proposer_index) {
                    validator.missed_blocks_slots.push(bundle.slot);
                }
                state.fire(proposer_index, ValidatorEvent::MissedProposal);
            }
        }
        Some(block) => {
            let proposer = bundle.proposer.as_ref().ok_or_else(|| {
                ChainError::Missing(format!(
                    "proposer {} absent from the validator registry",
                    bundle.duty.validator_index
                ))
            })?;
            let classification = classify_block(
                Some(block),
                proposer,
                config.pool_address,
                bundle.vanilla_reward_wei,
            );
            let proposer_index = bundle.duty.validator_index;
            let record = BlockRecord {
                slot: bundle.slot,
                block_number: Some(block.block_number()),
                validator_index: proposer_index,
                validator_key: bundle.duty.pubkey,
                block_type: classification.block_type,
                reward_wei: classification.reward_wei,
                reward_kind: classification.reward_kind,
            };

            match classification.block_type {
                BlockType::OkPoolProposalBlsKeys => {
                    // The pool was paid but there is no address to enroll;
                    // the reward goes to pool fees and nothing else moves.
                    warn!(
                        slot = bundle.slot,
                        validator = proposer_index,
                        reward = %classification.reward_wei,
                        "pool proposal with BLS withdrawal credentials, reward kept as pool fees"
                    );
                    state.send_reward_to_pool(classification.reward_wei);
                }
                BlockType::OkPoolProposal => {
                    if let Some(withdrawal_address) = proposer.eth1_withdrawal_address() {
                        let validator = state.validator_entry(proposer_index, proposer.pubkey);
                        validator.withdrawal_address.get_or_insert(withdrawal_address);
                        validator.proposed_blocks_slots.push(bundle.slot);
                    }
                    state.proposed_blocks.push(record);
                    state.fire(proposer_index, ValidatorEvent::ProposalWithCorrectFee);
                    state.increase_all_pending_rewards(classification.reward_wei);
                    state.consolidate_balance(proposer_index);
                }
                BlockType::WrongFeeRecipient => {
                    let subscribed = state
                        .validators
                        .get(&proposer_index)
                        .is_some_and(|v| v.is_subscribed());
                    if subscribed {
                        state.wrong_fee_blocks.push(record);
                        if let Some(validator) = state.validators.get_mut(&proposer_index) {
                            validator.wrong_fee_blocks_slots.push(bundle.slot);
                        }
                        state.fire(proposer_index, ValidatorEvent::ProposalWithWrongFee);
                        state.reset_pending_rewards(proposer_index);
                    }
                }
                BlockType::MissedProposal => {
                    unreachable!("classification of an existing block is never MissedProposal")
                }
            }
        }
    }

    // Unsubscriptions last: the departing validator earned this slot.
    for event in &bundle.events.unsubscriptions {
        state.apply_unsubscription(event);
    }
    for event in &bundle.events.donations {
        state.apply_donation(event);
    }

    state.latest_processed_slot = bundle.slot + 1;
    if let Some(block) = &bundle.block {
        state.latest_processed_block = block.block_number();
    }
    Ok(())
}

/// Long-running single-writer task: waits for finality, advances one slot at
/// a time and commits checkpoints on period boundaries.
pub struct Driver<A, P, S> {
    adapter: A,
    publisher: P,
    sink: S,
    state: SharedState,
    config: OracleConfig,
    shutdown: watch::Receiver<bool>,
}

impl<A, P, S> Driver<A, P, S>
where
    A: ChainAdapter,
    P: RootPublisher,
    S: StateSink,
{
    pub fn new(
        adapter: A,
        publisher: P,
        sink: S,
        state: SharedState,
        config: OracleConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            adapter,
            publisher,
            sink,
            state,
            config,
            shutdown,
        }
    }

    /// Runs until shutdown is signalled or an inconsistency is found. The
    /// slot in flight is always finished before exiting.
    pub async fn run(mut self) -> Result<(), OracleError> {
        self.sink.reset().await;
        info!(
            deployed_slot = self.config.deployed_slot,
            checkpoint_size = self.config.checkpoint_size_in_slots,
            network = %self.config.network,
            "oracle driver starting"
        );

        loop {
            if *self.shutdown.borrow() {
                info!("shutdown requested, driver exiting");
                return Ok(());
            }

            let finalized_slot = match self.adapter.finalized_slot().await {
                Ok(slot) => slot,
                Err(err) if err.is_transient() => {
                    warn!(%err, "could not read finality, retrying");
                    self.sleep_interrupted().await;
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            let next_slot = self.state.read().await.latest_processed_slot;
            gauge!("spool_oracle_head_distance")
                .set(finalized_slot.saturating_sub(next_slot) as f64);

            // Never run ahead of finality.
            if finalized_slot <= next_slot {
                info!(finalized_slot, next_slot, "waiting for new finalized slot");
                self.sleep_interrupted().await;
                continue;
            }

            match self.advance_one_slot(next_slot).await {
                Ok(()) => {
                    info!(
                        "[{}/{}] processed slot, {} remaining",
                        next_slot,
                        finalized_slot,
                        finalized_slot - next_slot - 1
                    );
                    gauge!("spool_oracle_latest_processed_slot").set(next_slot as f64);
                    self.maybe_checkpoint().await?;
                }
                Err(err) if err.kind() == ErrorKind::Transient => {
                    // Retry the entire slot after a delay; nothing was
                    // written for it.
                    warn!(slot = next_slot, %err, "transient failure, retrying slot");
                    counter!("spool_oracle_slot_retries").increment(1);
                    self.sleep_interrupted().await;
                }
                Err(err) => {
                    error!(slot = next_slot, %err, "stopping: state requires operator attention");
                    return Err(err);
                }
            }
        }
    }

    /// Fetches everything for `slot` without holding the lock, then applies
    /// the transition under the write lock.
    #[instrument(name = "driver::advance_one_slot", skip(self))]
    async fn advance_one_slot(&self, slot: Slot) -> Result<(), OracleError> {
        let duty = self.adapter.proposer_duty(slot).await?;
        let block = self.adapter.block_at_slot(slot).await?;

        let mut bundle = SlotBundle {
            slot,
            duty,
            block,
            proposer: None,
            registry: BTreeMap::new(),
            events: PoolEvents::default(),
            vanilla_reward_wei: U256::ZERO,
        };

        if let Some(block) = &bundle.block {
            let block_number = block.block_number();
            bundle.proposer = self.adapter.validator_by_index(duty.validator_index).await?;
            bundle.events = self.adapter.pool_events(block_number, block_number).await?;
            bundle.vanilla_reward_wei = self.adapter.vanilla_reward(block_number).await?;

            for event in &bundle.events.subscriptions {
                if bundle.registry.contains_key(&event.validator_index) {
                    continue;
                }
                if let Some(entry) =
                    self.adapter.validator_by_index(event.validator_index).await?
                {
                    bundle.registry.insert(event.validator_index, entry);
                }
            }
            if let Some(proposer) = &bundle.proposer {
                bundle.registry.insert(duty.validator_index, proposer.clone());
            }
        }

        let mut state = self.state.write().await;
        apply_slot(&mut state, &self.config, &bundle)?;

        let label = if bundle.block.is_none() {
            "missed"
        } else if state.wrong_fee_blocks.last().is_some_and(|b| b.slot == slot) {
            "wrong_fee_recipient"
        } else if state.proposed_blocks.last().is_some_and(|b| b.slot == slot) {
            "ok_pool_proposal"
        } else {
            "bls_keys"
        };
        counter!("spool_oracle_blocks_processed", "type" => label).increment(1);
        Ok(())
    }

    /// Commits and publishes a checkpoint when the processed slot lands on a
    /// period boundary and at least one slot was processed since the last
    /// commit.
    async fn maybe_checkpoint(&self) -> Result<(), OracleError> {
        let (processed_slot, due) = {
            let state = self.state.read().await;
            let processed = state.latest_processed_slot;
            let on_boundary = (processed - self.config.deployed_slot)
                % self.config.checkpoint_size_in_slots
                == 0;
            let advanced = processed > self.config.deployed_slot
                && state
                    .latest_committed_state
                    .as_ref()
                    .is_none_or(|committed| committed.slot != processed);
            (processed, on_boundary && advanced)
        };
        if !due {
            return Ok(());
        }

        let root = {
            let mut state = self.state.write().await;
            state.commit_checkpoint()
        };
        info!(slot = processed_slot, %root, "checkpoint committed");
        counter!("spool_oracle_checkpoints").increment(1);

        self.publisher.publish_root(processed_slot, root).await?;

        let state = self.state.read().await;
        self.sink.mirror(&state).await;
        Ok(())
    }

    /// Sleeps the retry delay, waking early on shutdown; the loop re-checks
    /// the shutdown flag at the top of every iteration.
    async fn sleep_interrupted(&mut self) {
        tokio::select! {
            _ = tokio::time::sleep(RETRY_DELAY) => {}
            _ = self.shutdown.changed() => {}
        }
    }
}
