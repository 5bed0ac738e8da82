use alloy_primitives::{Address, U256};
use clap::Parser;
use spool_oracle::OracleConfig;
use url::Url;

/// 0.08 ETH, the default subscription collateral.
const DEFAULT_COLLATERAL_WEI: &str = "80000000000000000";

#[derive(Parser, Debug)]
#[command(author, version, about = "Smoothing-pool reward oracle", long_about = None)]
pub struct SpoolArgs {
    /// Beacon node REST endpoint
    #[arg(long, required = true)]
    pub consensus_endpoint: Url,

    /// Execution node JSON-RPC endpoint
    #[arg(long, required = true)]
    pub execution_endpoint: Url,

    /// Address of the smoothing-pool contract
    #[arg(long, required = true)]
    pub pool_address: Address,

    /// Address the pool-fees leaf accrues to
    #[arg(long, required = true)]
    pub pool_fees_address: Address,

    /// Percent (0-100) of each reward kept as pool fees
    #[arg(long, default_value_t = 10)]
    pub pool_fees_percent: u8,

    /// Slot the pool contract was deployed at; replay starts here
    #[arg(long, required = true)]
    pub deployed_slot: u64,

    /// Checkpoint period in slots
    #[arg(long, default_value_t = 7200)]
    pub checkpoint_size: u64,

    /// Minimum subscription collateral in wei
    #[arg(long, default_value = DEFAULT_COLLATERAL_WEI)]
    pub collateral_wei: U256,

    /// Port the JSON API listens on
    #[arg(long, default_value_t = 7300)]
    pub api_port: u16,

    /// Compute checkpoints without publishing roots on-chain
    #[arg(long)]
    pub dry_run: bool,

    /// Network label for logs and /status
    #[arg(long, default_value = "mainnet")]
    pub network: String,
}

impl SpoolArgs {
    pub fn oracle_config(&self) -> OracleConfig {
        OracleConfig {
            pool_address: self.pool_address,
            pool_fees_address: self.pool_fees_address,
            pool_fees_percent: self.pool_fees_percent,
            deployed_slot: self.deployed_slot,
            checkpoint_size_in_slots: self.checkpoint_size,
            collateral_wei: self.collateral_wei,
            dry_run: self.dry_run,
            network: self.network.clone(),
        }
    }
}
