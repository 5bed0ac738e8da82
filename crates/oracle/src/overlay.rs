//! Non-finalized membership overlay for API reads.
//!
//! Builds a head-of-chain view of the validator map by replaying the
//! membership events between the last finalized block and head on a copy of
//! the finalized state. Only `status` and `pending_rewards_wei` move; the
//! ledger, accumulated balances and the block collections are finalized-only
//! and never touched here.

use crate::adapter::MembershipEvent;
use crate::state::ValidatorInfo;
use alloy_primitives::U256;
use spool_primitives::{BeaconValidator, ValidatorEvent, ValidatorStatus};
use std::collections::BTreeMap;
use tracing::debug;

/// Replays `events` (already in `(block_number, log_index)` order) over a
/// copy of the finalized validator map.
///
/// `registry` supplies withdrawal credentials for validators the finalized
/// state has not seen yet; events for indices absent from both are skipped.
pub fn overlay_validators(
    finalized: &BTreeMap<u64, ValidatorInfo>,
    events: &[MembershipEvent],
    registry: &BTreeMap<u64, BeaconValidator>,
    collateral_bar: U256,
) -> BTreeMap<u64, ValidatorInfo> {
    let mut view = finalized.clone();

    for event in events {
        match event {
            MembershipEvent::Subscribe(subscribe) => {
                let index = subscribe.validator_index;
                let beacon = registry.get(&index);

                let withdrawal_address = match view.get(&index).and_then(|v| v.withdrawal_address)
                {
                    Some(address) => Some(address),
                    None => beacon.and_then(BeaconValidator::eth1_withdrawal_address),
                };
                let Some(withdrawal_address) = withdrawal_address else {
                    debug!(validator = index, "overlay: no withdrawal address, skipping");
                    continue;
                };
                if subscribe.sender != withdrawal_address
                    || subscribe.collateral_wei < collateral_bar
                {
                    continue;
                }

                let validator = view.entry(index).or_insert_with(|| {
                    let key = beacon.map(|b| b.pubkey).unwrap_or_default();
                    let mut info = ValidatorInfo::new(index, key);
                    info.withdrawal_address = Some(withdrawal_address);
                    info
                });
                if validator.is_subscribed() || validator.status == ValidatorStatus::Banned {
                    continue;
                }
                validator.status = validator.status.advance(ValidatorEvent::ManualSubscription);
                validator.pending_rewards_wei += subscribe.collateral_wei;
            }
            MembershipEvent::Unsubscribe(unsubscribe) => {
                let index = unsubscribe.validator_index;
                let Some(validator) = view.get_mut(&index) else {
                    continue;
                };
                if !validator.is_subscribed()
                    || validator.withdrawal_address != Some(unsubscribe.sender)
                {
                    continue;
                }
                validator.status = validator.status.advance(ValidatorEvent::ManualUnsubscription);
                validator.pending_rewards_wei = U256::ZERO;
            }
        }
    }

    view
}
