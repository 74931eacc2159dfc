//! Error types used across Tokenrail.
use thiserror::Error;

use super::action::ActionId;

/// High-level error categories for type-level operations and adapters.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("invalid value")]
    InvalidValue,
    #[error("io error")]
    Io,
    #[error("policy violation")]
    Policy,
}

/// Structured error with a kind and human message.
#[derive(Debug, Error)]
#[error("{kind:?}: {msg}")]
pub struct Error {
    pub kind: ErrorKind,
    pub msg: String,
}

/// Convenient alias for results returning a `types::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Plan construction failures. No partial plan is ever returned alongside one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    #[error("duplicate action id `{0}`")]
    DuplicateId(ActionId),
    #[error("action `{action}` depends on unknown action `{missing}`")]
    UnknownDependency { action: ActionId, missing: ActionId },
    #[error("dependency cycle among actions: {}", join_ids(.involved))]
    Cycle { involved: Vec<ActionId> },
    #[error("action `{action}` is malformed: {reason}")]
    MalformedAction { action: ActionId, reason: String },
    #[error("allocation `{0}` has a zero amount")]
    ZeroAmount(String),
    #[error("allocation `{name}`: vesting cliff {cliff}s exceeds duration {duration}s")]
    CliffExceedsDuration { name: String, cliff: u64, duration: u64 },
    #[error("allocation `{0}`: vesting slice interval must be positive")]
    ZeroSliceInterval(String),
    #[error("allocation `{0}` has vesting terms but the campaign names no vesting holder")]
    MissingVestingHolder(String),
    #[error("token `{0}` is whitelist-gated but the campaign names no whitelist contract")]
    MissingWhitelist(String),
    #[error("unknown contract `{0}`")]
    UnknownContract(String),
    #[error("contract name `{0}` declared more than once")]
    DuplicateContract(String),
    #[error("sum of allocations overflows")]
    SupplyOverflow,
    #[error("invalid campaign: {0}")]
    InvalidSpec(String),
}

fn join_ids(ids: &[ActionId]) -> String {
    ids.iter()
        .map(ActionId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
