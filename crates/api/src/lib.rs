//! Read-only HTTP API over the oracle state.
//!
//! `/memory/*` serves what the oracle has replayed from finalized data;
//! `/memory/validators/{address}` additionally applies the non-finalized
//! membership overlay. `/onchain/*` reconciles against the pool contract.
//! All errors are JSON `{code, message}`.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod handlers;
pub mod types;

pub use handlers::ApiContext;

use metrics_exporter_prometheus::PrometheusHandle;
use poem::{EndpointExt, Route, get};
use std::sync::Arc;

/// Builds the full router. The metrics handle is optional so tests can
/// spin up the API without a recorder installed.
pub fn router(context: Arc<ApiContext>, metrics: Option<PrometheusHandle>) -> Route {
    let mut route = Route::new()
        .at("/", get(handlers::root))
        .at("/status", get(handlers::status.data(context.clone())))
        .at(
            "/memory/validators",
            get(handlers::memory_validators.data(context.clone())),
        )
        .at(
            "/memory/validator/:index",
            get(handlers::memory_validator_by_index.data(context.clone())),
        )
        .at(
            "/memory/validators/:address",
            get(handlers::memory_validators_by_address.data(context.clone())),
        )
        .at(
            "/memory/feesinfo",
            get(handlers::memory_fees_info.data(context.clone())),
        )
        .at(
            "/memory/statistics",
            get(handlers::memory_statistics.data(context.clone())),
        )
        .at(
            "/memory/proposedblocks",
            get(handlers::memory_proposed_blocks.data(context.clone())),
        )
        .at(
            "/memory/missedblocks",
            get(handlers::memory_missed_blocks.data(context.clone())),
        )
        .at(
            "/memory/wrongfeeblocks",
            get(handlers::memory_wrong_fee_blocks.data(context.clone())),
        )
        .at(
            "/memory/donations",
            get(handlers::memory_donations.data(context.clone())),
        )
        .at(
            "/onchain/merkleroot",
            get(handlers::onchain_merkle_root.data(context.clone())),
        )
        .at(
            "/onchain/latestcheckpoint",
            get(handlers::onchain_latest_checkpoint.data(context.clone())),
        )
        .at(
            "/onchain/proof/:address",
            get(handlers::onchain_proof.data(context)),
        );

    if let Some(handle) = metrics {
        route = route.at("/metrics", get(handlers::prometheus_metrics.data(handle)));
    }
    route
}
