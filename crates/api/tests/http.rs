//! HTTP-level tests: finalized endpoints, the overlay-aware address query
//! and the proof gate against the contract root.

use alloy_primitives::{Address, B256, U256, address};
use async_trait::async_trait;
use poem::test::TestClient;
use spool_api::{ApiContext, router};
use spool_oracle::{
    ChainAdapter, ChainError, NodeStatus, OracleConfig, OracleState, PoolEvents, ValidatorInfo,
};
use spool_primitives::{
    BeaconValidator, BlsPublicKey, ProposerDuty, Slot, SubscribeEvent, ValidatorLiveness,
    ValidatorStatus, VersionedBeaconBlock,
};
use std::sync::Arc;
use tokio::sync::RwLock;

const WITHDRAWAL: Address = address!("0x1000000000000000000000000000000000000001");
const FEES: Address = address!("0x0000000000000000000000000000000000000abc");

fn config() -> OracleConfig {
    OracleConfig {
        pool_address: address!("0x455e5aa18469bc6ccef49594645666c587a3a71b"),
        pool_fees_address: FEES,
        pool_fees_percent: 0,
        deployed_slot: 1_000,
        checkpoint_size_in_slots: 100,
        collateral_wei: U256::from(1_000u64),
        dry_run: true,
        network: "testnet".into(),
    }
}

/// Adapter with a configurable head event stream and contract root.
struct MockAdapter {
    head_block: u64,
    head_events: PoolEvents,
    contract_root: B256,
}

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

#[async_trait]
impl ChainAdapter for MockAdapter {
    async fn proposer_duty(&self, slot: Slot) -> Result<ProposerDuty, ChainError> {
        Ok(ProposerDuty {
            slot,
            validator_index: 0,
            pubkey: BlsPublicKey::ZERO,
        })
    }

    async fn block_at_slot(&self, _slot: Slot) -> Result<Option<VersionedBeaconBlock>, ChainError> {
        Ok(None)
    }

    async fn validator_by_index(&self, index: u64) -> Result<Option<BeaconValidator>, ChainError> {
        Ok(Some(beacon_validator(index)))
    }

    async fn finalized_slot(&self) -> Result<Slot, ChainError> {
        Ok(1_010)
    }

    async fn head_block_number(&self) -> Result<u64, ChainError> {
        Ok(self.head_block)
    }

    async fn pool_events(&self, _from: u64, _to: u64) -> Result<PoolEvents, ChainError> {
        Ok(self.head_events.clone())
    }

    async fn vanilla_reward(&self, _block_number: u64) -> Result<U256, ChainError> {
        Ok(U256::ZERO)
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
        Ok(self.contract_root)
    }

    async fn claimed_balance(&self, _address: Address) -> Result<U256, ChainError> {
        Ok(U256::from(500u64))
    }
}

fn seeded_state(config: &OracleConfig) -> OracleState {
    let mut state = OracleState::new(config);
    let mut validator = ValidatorInfo::new(5, BlsPublicKey::repeat_byte(5));
    validator.status = ValidatorStatus::NotSubscribed;
    validator.withdrawal_address = Some(WITHDRAWAL);
    validator.pending_rewards_wei = U256::from(100u64);
    validator.accumulated_rewards_wei = U256::from(2_000u64);
    state.validators.insert(5, validator);
    state.latest_processed_slot = 1_010;
    state.latest_processed_block = 110;
    state
}

fn client(state: OracleState, adapter: MockAdapter) -> TestClient<poem::Route> {
    let context = Arc::new(ApiContext {
        state: Arc::new(RwLock::new(state)),
        config: config(),
        adapter: Arc::new(adapter),
    });
    TestClient::new(router(context, None))
}

fn head_subscription() -> PoolEvents {
    PoolEvents {
        subscriptions: vec![SubscribeEvent {
            validator_index: 5,
            sender: WITHDRAWAL,
            collateral_wei: U256::from(1_500u64),
            block_number: 115,
            log_index: 0,
        }],
        ..Default::default()
    }
}

#[tokio::test]
async fn finalized_endpoint_ignores_head_events() {
    let cli = client(
        seeded_state(&config()),
        MockAdapter {
            head_block: 120,
            head_events: head_subscription(),
            contract_root: B256::ZERO,
        },
    );

    let resp = cli.get("/memory/validator/5").send().await;
    resp.assert_status_is_ok();
    let json = resp.json().await;
    json.value()
        .object()
        .get("status")
        .assert_string("not_subscribed");
}

#[tokio::test]
async fn address_endpoint_applies_overlay() {
    let cli = client(
        seeded_state(&config()),
        MockAdapter {
            head_block: 120,
            head_events: head_subscription(),
            contract_root: B256::ZERO,
        },
    );

    let resp = cli
        .get(format!("/memory/validators/{WITHDRAWAL:#x}"))
        .send()
        .await;
    resp.assert_status_is_ok();
    let json = resp.json().await;
    let entries = json.value().array();
    assert_eq!(entries.len(), 1);
    let entry = entries.get(0).object();
    entry.get("status").assert_string("active");
    // prev pending 100 + collateral 1500
    entry.get("pending_rewards_wei").assert_string("0x640");
}

#[tokio::test]
async fn unknown_validator_is_a_json_error() {
    let cli = client(
        seeded_state(&config()),
        MockAdapter {
            head_block: 110,
            head_events: PoolEvents::default(),
            contract_root: B256::ZERO,
        },
    );

    let resp = cli.get("/memory/validator/77").send().await;
    resp.assert_status(poem::http::StatusCode::BAD_REQUEST);
    let json = resp.json().await;
    assert_eq!(json.value().object().get("code").i64(), 400);
}

#[tokio::test]
async fn statistics_totals() {
    let cli = client(
        seeded_state(&config()),
        MockAdapter {
            head_block: 110,
            head_events: PoolEvents::default(),
            contract_root: B256::ZERO,
        },
    );

    let resp = cli.get("/memory/statistics").send().await;
    resp.assert_status_is_ok();
    let json = resp.json().await;
    let object = json.value().object();
    assert_eq!(object.get("total_notsubscribed_validators").i64(), 1);
    assert_eq!(object.get("total_subscribed_validators").i64(), 0);
}

#[tokio::test]
async fn proof_requires_matching_contract_root() {
    let config = config();
    let mut state = seeded_state(&config);
    let root = state.commit_checkpoint();

    // Contract still carries an older root: the proof endpoint refuses.
    let cli = client(
        state.clone(),
        MockAdapter {
            head_block: 110,
            head_events: PoolEvents::default(),
            contract_root: B256::repeat_byte(0xdd),
        },
    );
    let resp = cli
        .get(format!("/onchain/proof/{WITHDRAWAL:#x}"))
        .send()
        .await;
    resp.assert_status(poem::http::StatusCode::INTERNAL_SERVER_ERROR);

    // Roots agree: leaf, proof and claim arithmetic are served.
    let cli = client(
        state,
        MockAdapter {
            head_block: 110,
            head_events: PoolEvents::default(),
            contract_root: root,
        },
    );
    let resp = cli
        .get(format!("/onchain/proof/{WITHDRAWAL:#x}"))
        .send()
        .await;
    resp.assert_status_is_ok();
    let json = resp.json().await;
    let object = json.value().object();
    object
        .get("leaf_accumulated_balance")
        .assert_string("0x7d0");
    object.get("claimed_wei").assert_string("0x1f4");
    object.get("claimable_wei").assert_string("0x5dc");
    let registered = object.get("registered_validators").array();
    assert_eq!(registered.len(), 1);
}
