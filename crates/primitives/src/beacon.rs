use crate::Slot;
use alloy_primitives::{Address, B256, Bytes, FixedBytes, U256};
use serde::{Deserialize, Serialize};

/// 48-byte BLS public key identifying a validator on the beacon chain.
pub type BlsPublicKey = FixedBytes<48>;

/// Withdrawal-credential prefix marking an execution-layer address.
pub const ETH1_CREDENTIAL_PREFIX: u8 = 0x01;

/// The duty assignment for one slot: which validator should propose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposerDuty {
    pub slot: Slot,
    pub validator_index: u64,
    pub pubkey: BlsPublicKey,
}

/// Beacon-side liveness of a validator, reduced to what the subscription
/// rules need: can this validator still produce blocks?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorLiveness {
    /// Pending or active and neither slashed nor exited.
    CanPropose,
    /// Slashed, exiting, exited or withdrawn.
    CannotPropose,
}

/// A validator registry entry as served by the beacon node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconValidator {
    pub index: u64,
    pub pubkey: BlsPublicKey,
    pub withdrawal_credentials: B256,
    pub liveness: ValidatorLiveness,
}

impl BeaconValidator {
    /// Returns the execution-layer withdrawal address, present if and only
    /// if the credentials are eth1-style (prefix byte `0x01`).
    pub fn eth1_withdrawal_address(&self) -> Option<Address> {
        let bytes = self.withdrawal_credentials.as_slice();
        if bytes[0] != ETH1_CREDENTIAL_PREFIX {
            return None;
        }
        Some(Address::from_slice(&bytes[12..]))
    }

    /// Whether the withdrawal credentials are still BLS-style (prefix `0x00`).
    pub fn has_bls_credentials(&self) -> bool {
        self.eth1_withdrawal_address().is_none()
    }
}

/// The parts of an execution payload the oracle consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPayloadData {
    pub fee_recipient: Address,
    pub block_number: u64,
    pub block_hash: B256,
    /// Raw EIP-2718 encoded transactions, in block order.
    pub transactions: Vec<Bytes>,
    /// Base fee of the block, used to derive the vanilla proposer reward.
    pub base_fee_per_gas: U256,
}

/// Common fields of a signed beacon block across forks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconBlockData {
    pub slot: Slot,
    pub proposer_index: u64,
    pub execution: ExecutionPayloadData,
}

/// A signed beacon block, tagged with the fork it was decoded from.
///
/// Consumers go through the accessors; nothing outside the chain adapter
/// branches on the fork version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "version", content = "data", rename_all = "snake_case")]
pub enum VersionedBeaconBlock {
    Bellatrix(BeaconBlockData),
    Capella(BeaconBlockData),
    Deneb(BeaconBlockData),
    Electra(BeaconBlockData),
}

impl VersionedBeaconBlock {
    fn data(&self) -> &BeaconBlockData {
        match self {
            Self::Bellatrix(data)
            | Self::Capella(data)
            | Self::Deneb(data)
            | Self::Electra(data) => data,
        }
    }

    pub fn slot(&self) -> Slot {
        self.data().slot
    }

    pub fn proposer_index(&self) -> u64 {
        self.data().proposer_index
    }

    pub fn fee_recipient(&self) -> Address {
        self.data().execution.fee_recipient
    }

    pub fn block_number(&self) -> u64 {
        self.data().execution.block_number
    }

    pub fn block_hash(&self) -> B256 {
        self.data().execution.block_hash
    }

    pub fn transactions(&self) -> &[Bytes] {
        &self.data().execution.transactions
    }

    pub fn base_fee_per_gas(&self) -> U256 {
        self.data().execution.base_fee_per_gas
    }
}
