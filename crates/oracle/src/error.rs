use crate::adapter::ChainError;
use spool_primitives::Slot;

/// How an error should be handled, per the driver's retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Retry after a delay; the chain or a node will catch up.
    Transient,
    /// The oracle's view disagrees with the chain. Processing must stop and
    /// an operator has to look; the state is never silently repaired.
    Inconsistent,
    /// Unrecoverable. The process exits.
    Fatal,
}

/// Errors surfaced by the oracle engine.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("block at slot {got} returned while processing slot {expected}")]
    SlotMismatch { expected: Slot, got: Slot },

    #[error("proposer duty at slot {slot} is for validator {duty} but block carries {block}")]
    ProposerMismatch { slot: Slot, duty: u64, block: u64 },

    #[error("contract root {contract} does not match oracle root {oracle}")]
    RootMismatch { contract: String, oracle: String },

    #[error("root publication failed: {0}")]
    Publish(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl OracleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Chain(err) if err.is_transient() => ErrorKind::Transient,
            Self::Chain(_) => ErrorKind::Inconsistent,
            Self::SlotMismatch { .. } | Self::ProposerMismatch { .. } | Self::RootMismatch { .. } => {
                ErrorKind::Inconsistent
            }
            Self::Publish(_) => ErrorKind::Transient,
            Self::Config(_) => ErrorKind::Fatal,
        }
    }
}
