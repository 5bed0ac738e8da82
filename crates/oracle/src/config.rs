use crate::error::OracleError;
use alloy_primitives::{Address, U256};
use spool_primitives::Slot;

/// Deploy-time parameters of the pool the oracle accounts for.
///
/// All of these are fixed for the lifetime of a deployment; changing any of
/// them mid-stream would fork the replayed state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleConfig {
    /// Address block rewards must be routed to.
    pub pool_address: Address,
    /// Address the pool-fees leaf is credited to in every checkpoint.
    pub pool_fees_address: Address,
    /// Integer percent (0-100) of each reward taken as pool fees.
    pub pool_fees_percent: u8,
    /// Slot the pool contract was deployed at; replay starts here.
    pub deployed_slot: Slot,
    /// Checkpoint period in slots.
    pub checkpoint_size_in_slots: u64,
    /// Minimum collateral a subscription must carry.
    pub collateral_wei: U256,
    /// Skip the on-chain root publication.
    pub dry_run: bool,
    /// Network label used for logging and `/status`.
    pub network: String,
}

impl OracleConfig {
    /// Validates the deploy parameters, rejecting values that would make the
    /// replay ill-defined.
    pub fn validate(&self) -> Result<(), OracleError> {
        if self.pool_fees_percent > 100 {
            return Err(OracleError::Config(format!(
                "pool fees percent {} exceeds 100",
                self.pool_fees_percent
            )));
        }
        if self.checkpoint_size_in_slots == 0 {
            return Err(OracleError::Config(
                "checkpoint size must be at least one slot".into(),
            ));
        }
        if self.pool_fees_address == self.pool_address {
            return Err(OracleError::Config(
                "pool fees address must differ from the pool address".into(),
            ));
        }
        Ok(())
    }
}
