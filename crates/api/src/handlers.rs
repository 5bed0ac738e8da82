//! Route handlers.
//!
//! Every handler takes the read lock briefly, clones what it needs and
//! releases before talking to the nodes; overlay computation never holds
//! the lock across an adapter call.

use crate::types::{
    CheckpointResponse, ErrorResponse, FeesInfoResponse, MerkleRootResponse, ProofResponse,
    StatusResponse, build_statistics, build_status,
};
use alloy_primitives::{Address, U256};
use metrics_exporter_prometheus::PrometheusHandle;
use poem::{
    IntoResponse, Response, handler,
    http::StatusCode,
    web::{Data, Json, Path},
};
use serde::Serialize;
use spool_oracle::{ChainAdapter, ChainError, OracleConfig, SharedState, overlay_validators};
use spool_primitives::BeaconValidator;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// Shared context handed to every handler.
pub struct ApiContext {
    pub state: SharedState,
    pub config: OracleConfig,
    pub adapter: Arc<dyn ChainAdapter>,
}

impl std::fmt::Debug for ApiContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn ok<T: Serialize + Send>(body: T) -> Response {
    Json(body).into_response()
}

fn error(code: StatusCode, message: impl Into<String>) -> Response {
    let message = message.into();
    warn!(code = code.as_u16(), reason = %message, "api error response");
    let mut response = Json(ErrorResponse {
        code: code.as_u16(),
        message,
    })
    .into_response();
    response.set_status(code);
    response
}

fn chain_error(err: ChainError) -> Response {
    error(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("chain call failed: {err}"),
    )
}

#[handler]
pub async fn root() -> Response {
    ok("see the repository README for the available endpoints")
}

#[handler]
pub async fn status(Data(ctx): Data<&Arc<ApiContext>>) -> Response {
    let nodes = match ctx.adapter.node_status().await {
        Ok(nodes) => nodes,
        Err(err) => return chain_error(err),
    };
    let finalized_slot = match ctx.adapter.finalized_slot().await {
        Ok(slot) => slot,
        Err(err) => return chain_error(err),
    };

    let state = ctx.state.read().await;
    let response: StatusResponse = build_status(&state, &ctx.config, &nodes, finalized_slot);
    ok(response)
}

#[handler]
pub async fn memory_statistics(Data(ctx): Data<&Arc<ApiContext>>) -> Response {
    let state = ctx.state.read().await;
    ok(build_statistics(&state, &ctx.config))
}

#[handler]
pub async fn memory_validators(Data(ctx): Data<&Arc<ApiContext>>) -> Response {
    let state = ctx.state.read().await;
    ok(state.validators.values().cloned().collect::<Vec<_>>())
}

#[handler]
pub async fn memory_validator_by_index(
    Data(ctx): Data<&Arc<ApiContext>>,
    Path(index): Path<u64>,
) -> Response {
    let state = ctx.state.read().await;
    match state.validators.get(&index) {
        Some(validator) => ok(validator.clone()),
        None => error(
            StatusCode::BAD_REQUEST,
            format!("no tracked validator with index {index}"),
        ),
    }
}

/// Overlay-aware: reflects subscriptions and unsubscriptions seen between
/// the finalized pointer and head.
#[handler]
pub async fn memory_validators_by_address(
    Data(ctx): Data<&Arc<ApiContext>>,
    Path(address): Path<String>,
) -> Response {
    let Ok(address) = address.parse::<Address>() else {
        return error(
            StatusCode::BAD_REQUEST,
            format!("invalid withdrawal address: {address}"),
        );
    };

    // Copy the finalized view, then drop the lock before any chain call.
    let (finalized, from_block) = {
        let state = ctx.state.read().await;
        (state.validators.clone(), state.latest_processed_block)
    };

    let head = match ctx.adapter.head_block_number().await {
        Ok(head) => head,
        Err(err) => return chain_error(err),
    };
    let events = if head > from_block {
        match ctx.adapter.pool_events(from_block + 1, head).await {
            Ok(events) => events.membership_ordered(),
            Err(err) => return chain_error(err),
        }
    } else {
        Vec::new()
    };

    let mut registry: BTreeMap<u64, BeaconValidator> = BTreeMap::new();
    for event in &events {
        let index = event.validator_index();
        if finalized.contains_key(&index) || registry.contains_key(&index) {
            continue;
        }
        match ctx.adapter.validator_by_index(index).await {
            Ok(Some(entry)) => {
                registry.insert(index, entry);
            }
            Ok(None) => {}
            Err(err) => return chain_error(err),
        }
    }

    let view = overlay_validators(&finalized, &events, &registry, ctx.config.collateral_wei);
    let matching: Vec<_> = view
        .into_values()
        .filter(|validator| validator.withdrawal_address == Some(address))
        .collect();
    ok(matching)
}

#[handler]
pub async fn memory_fees_info(Data(ctx): Data<&Arc<ApiContext>>) -> Response {
    let state = ctx.state.read().await;
    ok(FeesInfoResponse {
        pool_fee_percent: state.pool_fees_percent,
        pool_fee_address: format!("{:#x}", state.pool_fees_address),
        pool_accumulated_fees_wei: state.pool_accumulated_fees_wei,
    })
}

#[handler]
pub async fn memory_proposed_blocks(Data(ctx): Data<&Arc<ApiContext>>) -> Response {
    ok(ctx.state.read().await.proposed_blocks.clone())
}

#[handler]
pub async fn memory_missed_blocks(Data(ctx): Data<&Arc<ApiContext>>) -> Response {
    ok(ctx.state.read().await.missed_blocks.clone())
}

#[handler]
pub async fn memory_wrong_fee_blocks(Data(ctx): Data<&Arc<ApiContext>>) -> Response {
    ok(ctx.state.read().await.wrong_fee_blocks.clone())
}

#[handler]
pub async fn memory_donations(Data(ctx): Data<&Arc<ApiContext>>) -> Response {
    ok(ctx.state.read().await.donations.clone())
}

#[handler]
pub async fn onchain_merkle_root(Data(ctx): Data<&Arc<ApiContext>>) -> Response {
    match ctx.adapter.contract_rewards_root().await {
        Ok(merkle_root) => ok(MerkleRootResponse { merkle_root }),
        Err(err) => chain_error(err),
    }
}

#[handler]
pub async fn onchain_latest_checkpoint(Data(ctx): Data<&Arc<ApiContext>>) -> Response {
    let state = ctx.state.read().await;
    match &state.latest_committed_state {
        Some(committed) => ok(CheckpointResponse {
            merkle_root: committed.merkle_root,
            checkpoint_slot: committed.slot,
        }),
        None => error(StatusCode::BAD_REQUEST, "no checkpoint committed yet"),
    }
}

/// Merkle proof for a withdrawal address, served only while the contract's
/// root matches the oracle's latest committed root.
#[handler]
pub async fn onchain_proof(
    Data(ctx): Data<&Arc<ApiContext>>,
    Path(address): Path<String>,
) -> Response {
    let Ok(address) = address.parse::<Address>() else {
        return error(
            StatusCode::BAD_REQUEST,
            format!("invalid withdrawal address: {address}"),
        );
    };

    let (committed, pending_wei) = {
        let state = ctx.state.read().await;
        let Some(committed) = state.latest_committed_state.clone() else {
            return error(StatusCode::BAD_REQUEST, "no checkpoint committed yet");
        };
        let pending: U256 = state
            .validators
            .values()
            .filter(|v| v.withdrawal_address == Some(address))
            .map(|v| v.pending_rewards_wei)
            .fold(U256::ZERO, |acc, x| acc + x);
        (committed, pending)
    };

    let contract_root = match ctx.adapter.contract_rewards_root().await {
        Ok(contract_root) => contract_root,
        Err(err) => return chain_error(err),
    };
    if contract_root != committed.merkle_root {
        // Mid-publication or a forked oracle; either way the proof would
        // not verify on-chain.
        return error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!(
                "contract root {contract_root} does not match oracle root {}",
                committed.merkle_root
            ),
        );
    }

    let Some(leaf) = committed.leaves_by_address.get(&address) else {
        return error(
            StatusCode::BAD_REQUEST,
            format!("no leaf for withdrawal address {address:#x}"),
        );
    };
    let proofs = committed
        .proofs_by_address
        .get(&address)
        .cloned()
        .unwrap_or_default();
    let registered_validators: Vec<u64> = committed
        .validators
        .values()
        .filter(|v| v.withdrawal_address == Some(address))
        .map(|v| v.validator_index)
        .collect();

    let claimed_wei = match ctx.adapter.claimed_balance(address).await {
        Ok(claimed) => claimed,
        Err(err) => return chain_error(err),
    };

    ok(ProofResponse {
        leaf_withdrawal_address: format!("{:#x}", leaf.withdrawal_address),
        leaf_accumulated_balance: leaf.accumulated_balance,
        merkle_root: committed.merkle_root,
        checkpoint_slot: committed.slot,
        merkle_proofs: proofs,
        registered_validators,
        claimed_wei,
        claimable_wei: leaf.accumulated_balance.saturating_sub(claimed_wei),
        pending_wei,
    })
}

#[handler]
pub async fn prometheus_metrics(Data(handle): Data<&PrometheusHandle>) -> Response {
    Response::builder()
        .header("content-type", "text/plain")
        .body(handle.render())
}
