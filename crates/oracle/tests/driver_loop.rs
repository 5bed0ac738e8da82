//! Drives the main loop against a mock chain: a short finalized range with
//! one subscription, a proposal and a checkpoint boundary.

use alloy_primitives::{Address, B256, U256, address};
use async_trait::async_trait;
use spool_oracle::{
    ChainAdapter, ChainError, Driver, DryRunPublisher, NodeStatus, NullSink, OracleConfig,
    OracleState, PoolEvents,
};
use spool_primitives::{
    BeaconValidator, BlsPublicKey, ProposerDuty, Slot, SubscribeEvent, ValidatorLiveness,
    ValidatorStatus, VersionedBeaconBlock,
    beacon::{BeaconBlockData, ExecutionPayloadData},
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, watch};

const POOL: Address = address!("0x455e5aa18469bc6ccef49594645666c587a3a71b");
const FEES: Address = address!("0x0000000000000000000000000000000000000abc");
const WITHDRAWAL: Address = address!("0x1000000000000000000000000000000000000001");

const DEPLOYED_SLOT: Slot = 1_000;

fn config() -> OracleConfig {
    OracleConfig {
        pool_address: POOL,
        pool_fees_address: FEES,
        pool_fees_percent: 0,
        deployed_slot: DEPLOYED_SLOT,
        checkpoint_size_in_slots: 2,
        collateral_wei: U256::from(1_000u64),
        dry_run: true,
        network: "testnet".into(),
    }
}

/// Three finalized slots: a subscription block, a pool proposal by the
/// subscriber, and a missed slot.
struct MockChain;

fn beacon_validator(index: u64) -> BeaconValidator {
    let mut credentials = [0u8; 32];
    credentials[0] = 0x01;
    credentials[12..].copy_from_slice(WITHDRAWAL.as_slice());
    BeaconValidator {
        index,
        pubkey: BlsPublicKey::repeat_byte(index as u8),
        withdrawal_credentials: B256::from(credentials),
        liveness: ValidatorLiveness::CanPropose,
    }
}

fn block(slot: Slot, proposer: u64, fee_recipient: Address) -> VersionedBeaconBlock {
    VersionedBeaconBlock::Deneb(BeaconBlockData {
        slot,
        proposer_index: proposer,
        execution: ExecutionPayloadData {
            fee_recipient,
            block_number: slot - 900,
            block_hash: B256::ZERO,
            transactions: vec![],
            base_fee_per_gas: U256::from(7u64),
        },
    })
}

#[async_trait]
impl ChainAdapter for MockChain {
    async fn proposer_duty(&self, slot: Slot) -> Result<ProposerDuty, ChainError> {
        let validator_index = match slot {
            s if s == DEPLOYED_SLOT => 9, // stranger proposes the events block
            _ => 1,
        };
        Ok(ProposerDuty {
            slot,
            validator_index,
            pubkey: BlsPublicKey::repeat_byte(validator_index as u8),
        })
    }

    async fn block_at_slot(&self, slot: Slot) -> Result<Option<VersionedBeaconBlock>, ChainError> {
        Ok(match slot {
            s if s == DEPLOYED_SLOT => Some(block(slot, 9, Address::ZERO)),
            s if s == DEPLOYED_SLOT + 1 => Some(block(slot, 1, POOL)),
            _ => None,
        })
    }

    async fn validator_by_index(&self, index: u64) -> Result<Option<BeaconValidator>, ChainError> {
        Ok(Some(beacon_validator(index)))
    }

    async fn finalized_slot(&self) -> Result<Slot, ChainError> {
        Ok(DEPLOYED_SLOT + 3)
    }

    async fn head_block_number(&self) -> Result<u64, ChainError> {
        Ok(DEPLOYED_SLOT - 900 + 3)
    }

    async fn pool_events(&self, from_block: u64, _to_block: u64) -> Result<PoolEvents, ChainError> {
        if from_block == DEPLOYED_SLOT - 900 {
            Ok(PoolEvents {
                subscriptions: vec![SubscribeEvent {
                    validator_index: 1,
                    sender: WITHDRAWAL,
                    collateral_wei: U256::from(2_000u64),
                    block_number: from_block,
                    log_index: 0,
                }],
                ..Default::default()
            })
        } else {
            Ok(PoolEvents::default())
        }
    }

    async fn vanilla_reward(&self, _block_number: u64) -> Result<U256, ChainError> {
        Ok(U256::from(10_000u64))
    }

    async fn node_status(&self) -> Result<NodeStatus, ChainError> {
        Ok(NodeStatus {
            consensus_in_sync: true,
            execution_in_sync: true,
            execution_chain_id: 17000,
            deposit_contract: "0x4242424242424242424242424242424242424242".into(),
        })
    }

    async fn contract_rewards_root(&self) -> Result<B256, ChainError> {
        Ok(B256::ZERO)
    }

    async fn claimed_balance(&self, _address: Address) -> Result<U256, ChainError> {
        Ok(U256::ZERO)
    }
}

#[tokio::test]
async fn driver_processes_to_finality_and_checkpoints() {
    let config = config();
    let state: Arc<RwLock<OracleState>> = Arc::new(RwLock::new(OracleState::new(&config)));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let driver = Driver::new(
        MockChain,
        DryRunPublisher,
        NullSink,
        state.clone(),
        config,
        shutdown_rx,
    );
    let handle = tokio::spawn(driver.run());

    // Wait until the driver has caught up with finality.
    for _ in 0..100 {
        if state.read().await.latest_processed_slot == DEPLOYED_SLOT + 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    shutdown_tx.send(true).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("driver exits after shutdown")
        .expect("driver task does not panic");
    assert!(result.is_ok());

    let state = state.read().await;
    assert_eq!(state.latest_processed_slot, DEPLOYED_SLOT + 3);

    // Subscription landed, the proposal consolidated collateral + reward.
    let validator = &state.validators[&1];
    assert_eq!(validator.status, ValidatorStatus::YellowCard); // missed the third slot
    assert_eq!(validator.accumulated_rewards_wei, U256::from(12_000u64));
    assert_eq!(state.proposed_blocks.len(), 1);
    assert_eq!(state.missed_blocks.len(), 1);

    // Checkpoint boundary at deployed + 2 was committed.
    let committed = state.latest_committed_state.as_ref().expect("checkpoint");
    assert_eq!(committed.slot, DEPLOYED_SLOT + 2);
    assert_ne!(committed.merkle_root, B256::ZERO);
    let mut addresses: BTreeMap<Address, U256> = BTreeMap::new();
    for leaf in &committed.raw_leaves {
        addresses.insert(leaf.withdrawal_address, leaf.accumulated_balance);
    }
    assert_eq!(addresses[&WITHDRAWAL], U256::from(12_000u64));
    assert_eq!(addresses[&FEES], U256::ZERO);
}
