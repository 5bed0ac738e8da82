//! Applying on-chain subscription, unsubscription and donation events.

use crate::state::OracleState;
use alloy_primitives::U256;
use spool_primitives::{
    BeaconValidator, Donation, DonationEvent, SubscribeEvent, UnsubscribeEvent, ValidatorEvent,
    ValidatorLiveness, ValidatorStatus,
};
use tracing::{info, warn};

impl OracleState {
    /// Applies one `SubscribeValidator` event.
    ///
    /// A valid subscription needs the sender to be the validator's own
    /// eth1-style withdrawal address, a validator that can still propose,
    /// and at least `collateral_bar` attached. Anything else forfeits the
    /// collateral to the pool fee without touching validator state.
    pub fn apply_subscription(
        &mut self,
        event: &SubscribeEvent,
        beacon: Option<&BeaconValidator>,
        collateral_bar: U256,
    ) {
        let index = event.validator_index;

        let Some(beacon) = beacon else {
            warn!(validator = index, "subscription for unknown validator index");
            self.send_reward_to_pool(event.collateral_wei);
            return;
        };
        let Some(withdrawal_address) = beacon.eth1_withdrawal_address() else {
            warn!(validator = index, "subscription with BLS withdrawal credentials");
            self.send_reward_to_pool(event.collateral_wei);
            return;
        };
        if beacon.liveness != ValidatorLiveness::CanPropose {
            warn!(validator = index, "subscription for exited or slashed validator");
            self.send_reward_to_pool(event.collateral_wei);
            return;
        }
        if event.sender != withdrawal_address {
            warn!(
                validator = index,
                sender = %event.sender,
                withdrawal = %withdrawal_address,
                "subscription sender is not the withdrawal address"
            );
            self.send_reward_to_pool(event.collateral_wei);
            return;
        }
        if event.collateral_wei < collateral_bar {
            warn!(
                validator = index,
                collateral = %event.collateral_wei,
                required = %collateral_bar,
                "subscription collateral below the bar"
            );
            self.send_reward_to_pool(event.collateral_wei);
            return;
        }

        if let Some(tracked) = self.validators.get(&index)
            && (tracked.is_subscribed() || tracked.status == ValidatorStatus::Banned)
        {
            // Already subscribed, or banned: no transition, collateral lost.
            warn!(validator = index, "subscription has no effect, collateral forfeited");
            self.send_reward_to_pool(event.collateral_wei);
            return;
        }

        let validator = self.validator_entry(index, beacon.pubkey);
        validator.withdrawal_address = Some(withdrawal_address);
        validator.validator_key = beacon.pubkey;
        validator.collateral_wei = event.collateral_wei;
        validator.pending_rewards_wei += event.collateral_wei;
        self.fire(index, ValidatorEvent::ManualSubscription);
        info!(
            validator = index,
            collateral = %event.collateral_wei,
            "validator subscribed"
        );
    }

    /// Applies one `UnsubscribeValidator` event: the departing validator's
    /// pending share is redistributed, its accumulated balance stays
    /// claimable.
    pub fn apply_unsubscription(&mut self, event: &UnsubscribeEvent) {
        let index = event.validator_index;
        let Some(validator) = self.validators.get(&index) else {
            warn!(validator = index, "unsubscription for untracked validator");
            return;
        };
        if !validator.is_subscribed() {
            warn!(validator = index, status = ?validator.status, "unsubscription while not subscribed");
            return;
        }
        if validator.withdrawal_address != Some(event.sender) {
            warn!(
                validator = index,
                sender = %event.sender,
                "unsubscription sender is not the withdrawal address"
            );
            return;
        }

        self.fire(index, ValidatorEvent::ManualUnsubscription);
        self.reset_pending_rewards(index);
        info!(validator = index, "validator unsubscribed");
    }

    /// Applies one `EtherReceived` event.
    pub fn apply_donation(&mut self, event: &DonationEvent) {
        self.send_reward_to_pool(event.amount_wei);
        self.donations.push(Donation {
            sender: event.sender,
            amount_wei: event.amount_wei,
            block_number: event.block_number,
        });
        info!(sender = %event.sender, amount = %event.amount_wei, "donation received");
    }
}
