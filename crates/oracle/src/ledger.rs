//! Reward ledger operations.
//!
//! All arithmetic is `U256` with integer floor division; every wei of every
//! reward ends up either in a validator's pending balance or in
//! `pool_accumulated_fees_wei`, never anywhere else.

use crate::state::OracleState;
use alloy_primitives::U256;

impl OracleState {
    /// Splits `total_amount` between the pool fee and all currently
    /// subscribed validators.
    ///
    /// The pool takes `floor(total * percent / 100)`; the rest is divided
    /// evenly with the floor remainder accruing to the pool fee. With no
    /// subscribers the whole amount goes to the pool fee.
    pub fn increase_all_pending_rewards(&mut self, total_amount: U256) {
        let subscribed = self.subscribed_indices();
        if subscribed.is_empty() {
            self.pool_accumulated_fees_wei += total_amount;
            return;
        }

        let pool_cut = total_amount * U256::from(self.pool_fees_percent) / U256::from(100u64);
        let to_share = total_amount - pool_cut;
        let count = U256::from(subscribed.len() as u64);
        let per_validator = to_share / count;
        let remainder = to_share % count;

        for index in subscribed {
            let validator = self
                .validators
                .get_mut(&index)
                .expect("subscribed index comes from the validator map");
            validator.pending_rewards_wei += per_validator;
        }
        self.pool_accumulated_fees_wei += pool_cut + remainder;
    }

    /// Moves a validator's pending balance into its accumulated balance.
    pub fn consolidate_balance(&mut self, validator_index: u64) {
        if let Some(validator) = self.validators.get_mut(&validator_index) {
            validator.accumulated_rewards_wei += validator.pending_rewards_wei;
            validator.pending_rewards_wei = U256::ZERO;
        }
    }

    /// Takes a validator's pending balance away and redistributes it across
    /// the other subscribed validators with the same floor/remainder rule
    /// (no pool-percent cut). With no other subscriber the share accrues to
    /// the pool fee.
    ///
    /// Used for the disgraced share on ban and on unsubscription.
    pub fn reset_pending_rewards(&mut self, validator_index: u64) {
        let Some(validator) = self.validators.get_mut(&validator_index) else {
            return;
        };
        let amount = validator.pending_rewards_wei;
        validator.pending_rewards_wei = U256::ZERO;
        if amount.is_zero() {
            return;
        }

        let others: Vec<u64> = self
            .subscribed_indices()
            .into_iter()
            .filter(|index| *index != validator_index)
            .collect();
        if others.is_empty() {
            self.pool_accumulated_fees_wei += amount;
            return;
        }

        let count = U256::from(others.len() as u64);
        let per_validator = amount / count;
        let remainder = amount % count;
        for index in others {
            let other = self
                .validators
                .get_mut(&index)
                .expect("subscribed index comes from the validator map");
            other.pending_rewards_wei += per_validator;
        }
        self.pool_accumulated_fees_wei += remainder;
    }

    /// Credits a reward straight to the pool fee.
    pub fn send_reward_to_pool(&mut self, amount: U256) {
        self.pool_accumulated_fees_wei += amount;
    }
}
