use thiserror::Error;

use crate::types::value::{Address, Value};

/// Failure modes of the contract-call boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The ledger refused the operation (revert, bad arguments, permission). Not retried.
    #[error("rejected: {0}")]
    Rejected(String),
    /// Transport-level failure; the operation may be retried.
    #[error("transient: {0}")]
    Transient(String),
    /// No confirmation within the bounded wait.
    #[error("no confirmation within {0}ms")]
    Timeout(u64),
}

impl LedgerError {
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Transient(_) | LedgerError::Timeout(_))
    }
}

/// Outcome of a confirmed state-changing submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Return values; for a deploy, value 0 is the new contract's address.
    pub values: Vec<Value>,
    pub tx_hash: Option<String>,
}

/// The remote ledger as seen by the run engine. Implementations block until the
/// submission is confirmed or `timeout_ms` elapses.
pub trait Ledger: Send + Sync {
    fn deploy(
        &self,
        signer: &str,
        contract: &str,
        args: &[Value],
        timeout_ms: u64,
    ) -> Result<Receipt, LedgerError>;

    fn call(
        &self,
        signer: &str,
        target: Address,
        method: &str,
        args: &[Value],
        timeout_ms: u64,
    ) -> Result<Receipt, LedgerError>;

    fn static_call(
        &self,
        target: Address,
        method: &str,
        args: &[Value],
        timeout_ms: u64,
    ) -> Result<Vec<Value>, LedgerError>;
}
