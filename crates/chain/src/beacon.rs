//! Minimal beacon-node REST client.
//!
//! Only the endpoints the oracle consumes: proposer duties, blocks by slot,
//! validator registry entries, finality checkpoints, node syncing and the
//! deposit contract. All numeric fields arrive as decimal strings per the
//! beacon API spec and are parsed here.

use alloy::primitives::{Address, B256, Bytes, U256};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use spool_oracle::ChainError;
use spool_primitives::{
    BeaconValidator, BlsPublicKey, Epoch, ProposerDuty, SLOTS_PER_EPOCH, Slot, ValidatorLiveness,
    VersionedBeaconBlock,
    beacon::{BeaconBlockData, ExecutionPayloadData},
};
use url::Url;

#[derive(Debug, Clone)]
pub struct BeaconClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl BeaconClient {
    pub fn new(endpoint: Url, http: reqwest::Client) -> Self {
        Self { http, endpoint }
    }

    /// GET a beacon API path, `Ok(None)` on 404.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ChainError> {
        let url = self
            .endpoint
            .join(path)
            .map_err(|err| ChainError::Decode(format!("bad beacon path {path}: {err}")))?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| ChainError::Transport(format!("beacon {path}: {err}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ChainError::Transport(format!(
                "beacon {path}: status {}",
                response.status()
            )));
        }
        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|err| ChainError::Decode(format!("beacon {path}: {err}")))
    }

    /// The proposer duty for a single slot.
    pub async fn proposer_duty(&self, slot: Slot) -> Result<ProposerDuty, ChainError> {
        let epoch = slot / SLOTS_PER_EPOCH;
        let path = format!("eth/v1/validator/duties/proposer/{epoch}");
        let duties: DataDto<Vec<ProposerDutyDto>> = self
            .get_json(&path)
            .await?
            .ok_or_else(|| ChainError::Missing(format!("no proposer duties for epoch {epoch}")))?;

        duties
            .data
            .iter()
            .find(|duty| duty.slot.parse::<Slot>() == Ok(slot))
            .ok_or_else(|| ChainError::Missing(format!("no proposer duty for slot {slot}")))?
            .to_duty()
    }

    /// The signed block at `slot`, `None` when the proposal was missed.
    pub async fn block_at_slot(
        &self,
        slot: Slot,
    ) -> Result<Option<VersionedBeaconBlock>, ChainError> {
        let path = format!("eth/v2/beacon/blocks/{slot}");
        let Some(block) = self.get_json::<VersionedBlockDto>(&path).await? else {
            return Ok(None);
        };
        block.to_block().map(Some)
    }

    /// Registry entry for a validator index at the finalized state.
    pub async fn validator_by_index(
        &self,
        index: u64,
    ) -> Result<Option<BeaconValidator>, ChainError> {
        let path = format!("eth/v1/beacon/states/finalized/validators/{index}");
        let Some(entry) = self.get_json::<DataDto<ValidatorEntryDto>>(&path).await? else {
            return Ok(None);
        };
        entry.data.to_validator().map(Some)
    }

    /// Epoch of the latest finalized checkpoint.
    pub async fn finalized_epoch(&self) -> Result<Epoch, ChainError> {
        let checkpoints: DataDto<FinalityCheckpointsDto> = self
            .get_json("eth/v1/beacon/states/head/finality_checkpoints")
            .await?
            .ok_or_else(|| ChainError::Missing("no finality checkpoints".into()))?;
        parse_u64(&checkpoints.data.finalized.epoch, "finalized epoch")
    }

    /// Whether the node reports itself in sync (allowing minimal jitter).
    pub async fn is_synced(&self) -> Result<bool, ChainError> {
        let syncing: DataDto<SyncingDto> = self
            .get_json("eth/v1/node/syncing")
            .await?
            .ok_or_else(|| ChainError::Missing("no syncing status".into()))?;
        let distance = parse_u64(&syncing.data.sync_distance, "sync distance")?;
        Ok(!syncing.data.is_syncing && distance < 2)
    }

    /// The deposit contract address advertised by the node.
    pub async fn deposit_contract(&self) -> Result<String, ChainError> {
        let contract: DataDto<DepositContractDto> = self
            .get_json("eth/v1/config/deposit_contract")
            .await?
            .ok_or_else(|| ChainError::Missing("no deposit contract".into()))?;
        Ok(contract.data.address)
    }
}

fn parse_u64(value: &str, what: &str) -> Result<u64, ChainError> {
    value
        .parse::<u64>()
        .map_err(|err| ChainError::Decode(format!("{what} {value:?}: {err}")))
}

fn parse_u256(value: &str, what: &str) -> Result<U256, ChainError> {
    value
        .parse::<U256>()
        .map_err(|err| ChainError::Decode(format!("{what} {value:?}: {err}")))
}

#[derive(Debug, Deserialize)]
struct DataDto<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ProposerDutyDto {
    pubkey: BlsPublicKey,
    validator_index: String,
    slot: String,
}

impl ProposerDutyDto {
    fn to_duty(&self) -> Result<ProposerDuty, ChainError> {
        Ok(ProposerDuty {
            slot: parse_u64(&self.slot, "duty slot")?,
            validator_index: parse_u64(&self.validator_index, "duty validator index")?,
            pubkey: self.pubkey,
        })
    }
}

#[derive(Debug, Deserialize)]
struct VersionedBlockDto {
    version: String,
    data: SignedBlockDto,
}

#[derive(Debug, Deserialize)]
struct SignedBlockDto {
    message: BlockMessageDto,
}

#[derive(Debug, Deserialize)]
struct BlockMessageDto {
    slot: String,
    proposer_index: String,
    body: BlockBodyDto,
}

#[derive(Debug, Deserialize)]
struct BlockBodyDto {
    execution_payload: ExecutionPayloadDto,
}

#[derive(Debug, Deserialize)]
struct ExecutionPayloadDto {
    fee_recipient: Address,
    block_number: String,
    block_hash: B256,
    base_fee_per_gas: String,
    transactions: Vec<Bytes>,
}

impl VersionedBlockDto {
    fn to_block(self) -> Result<VersionedBeaconBlock, ChainError> {
        let payload = self.data.message.body.execution_payload;
        let data = BeaconBlockData {
            slot: parse_u64(&self.data.message.slot, "block slot")?,
            proposer_index: parse_u64(&self.data.message.proposer_index, "proposer index")?,
            execution: ExecutionPayloadData {
                fee_recipient: payload.fee_recipient,
                block_number: parse_u64(&payload.block_number, "block number")?,
                block_hash: payload.block_hash,
                transactions: payload.transactions,
                base_fee_per_gas: parse_u256(&payload.base_fee_per_gas, "base fee")?,
            },
        };

        match self.version.as_str() {
            "bellatrix" => Ok(VersionedBeaconBlock::Bellatrix(data)),
            "capella" => Ok(VersionedBeaconBlock::Capella(data)),
            "deneb" => Ok(VersionedBeaconBlock::Deneb(data)),
            "electra" => Ok(VersionedBeaconBlock::Electra(data)),
            other => Err(ChainError::Decode(format!(
                "unsupported block version {other:?} (pre-merge forks carry no execution payload)"
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ValidatorEntryDto {
    index: String,
    status: String,
    validator: ValidatorDto,
}

#[derive(Debug, Deserialize)]
struct ValidatorDto {
    pubkey: BlsPublicKey,
    withdrawal_credentials: B256,
}

impl ValidatorEntryDto {
    fn to_validator(&self) -> Result<BeaconValidator, ChainError> {
        let liveness = match self.status.as_str() {
            "pending_initialized" | "pending_queued" | "active_ongoing" | "active_exiting" => {
                ValidatorLiveness::CanPropose
            }
            _ => ValidatorLiveness::CannotPropose,
        };
        Ok(BeaconValidator {
            index: parse_u64(&self.index, "validator index")?,
            pubkey: self.validator.pubkey,
            withdrawal_credentials: self.validator.withdrawal_credentials,
            liveness,
        })
    }
}

#[derive(Debug, Deserialize)]
struct FinalityCheckpointsDto {
    finalized: CheckpointDto,
}

#[derive(Debug, Deserialize)]
struct CheckpointDto {
    epoch: String,
}

#[derive(Debug, Deserialize)]
struct SyncingDto {
    is_syncing: bool,
    sync_distance: String,
}

#[derive(Debug, Deserialize)]
struct DepositContractDto {
    address: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_capella_block() {
        let payload = serde_json::json!({
            "version": "capella",
            "data": {
                "message": {
                    "slot": "5214321",
                    "proposer_index": "123456",
                    "body": {
                        "execution_payload": {
                            "fee_recipient": "0x455e5aa18469bc6ccef49594645666c587a3a71b",
                            "block_number": "17000000",
                            "block_hash": "0x47f5a9a0b6b2e55ad0b03b991e6b67f8b9b1e4a01e17f5c73d1d2e53d964f3a6",
                            "base_fee_per_gas": "27000000000",
                            "transactions": ["0x02f8718001843b9aca00847735940082520894455e5aa18469bc6ccef49594645666c587a3a71b8080c001a001a001"]
                        }
                    }
                }
            }
        });

        let dto: VersionedBlockDto = serde_json::from_value(payload).unwrap();
        let block = dto.to_block().unwrap();
        assert_eq!(block.slot(), 5_214_321);
        assert_eq!(block.proposer_index(), 123_456);
        assert_eq!(block.block_number(), 17_000_000);
        assert_eq!(block.base_fee_per_gas(), U256::from(27_000_000_000u64));
        assert_eq!(block.transactions().len(), 1);
        assert!(matches!(block, VersionedBeaconBlock::Capella(_)));
    }

    #[test]
    fn rejects_pre_merge_versions() {
        let payload = serde_json::json!({
            "version": "altair",
            "data": {
                "message": {
                    "slot": "1",
                    "proposer_index": "2",
                    "body": {
                        "execution_payload": {
                            "fee_recipient": "0x455e5aa18469bc6ccef49594645666c587a3a71b",
                            "block_number": "0",
                            "block_hash": "0x0000000000000000000000000000000000000000000000000000000000000000",
                            "base_fee_per_gas": "0",
                            "transactions": []
                        }
                    }
                }
            }
        });
        let dto: VersionedBlockDto = serde_json::from_value(payload).unwrap();
        assert!(dto.to_block().is_err());
    }

    #[test]
    fn maps_validator_statuses_to_liveness() {
        let entry = |status: &str| ValidatorEntryDto {
            index: "42".into(),
            status: status.into(),
            validator: ValidatorDto {
                pubkey: BlsPublicKey::ZERO,
                withdrawal_credentials: B256::ZERO,
            },
        };

        for status in ["active_ongoing", "active_exiting", "pending_queued"] {
            assert_eq!(
                entry(status).to_validator().unwrap().liveness,
                ValidatorLiveness::CanPropose,
                "{status}"
            );
        }
        for status in ["active_slashed", "exited_unslashed", "withdrawal_done"] {
            assert_eq!(
                entry(status).to_validator().unwrap().liveness,
                ValidatorLiveness::CannotPropose,
                "{status}"
            );
        }
    }

    #[test]
    fn parses_proposer_duty() {
        let payload = serde_json::json!({
            "pubkey": "0x93247f2209abcacf57b75a51dafae777f9dd38bc7053d1af526f220a7489a6d3a2753e5f3e8b1cfe39b56f43611df74a",
            "validator_index": "861327",
            "slot": "5214400"
        });
        let dto: ProposerDutyDto = serde_json::from_value(payload).unwrap();
        let duty = dto.to_duty().unwrap();
        assert_eq!(duty.validator_index, 861_327);
        assert_eq!(duty.slot, 5_214_400);
    }
}
