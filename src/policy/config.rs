use serde::{Deserialize, Serialize};

use super::types::{
    Execution, Governance, InDoubtPolicy, LockingPolicy, Retry, Timeouts, Verification,
};
use crate::types::errors::{Error, ErrorKind, Result};

/// Policy governs retries, timeouts, scheduling, verification, and locking for a run.
///
/// Grouped fields provide clearer ownership and ergonomics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    pub retry: Retry,
    pub timeouts: Timeouts,
    pub execution: Execution,
    pub verification: Verification,
    pub governance: Governance,
}

impl Policy {
    /// Construct a Policy configured with recommended **production defaults**.
    ///
    /// Enables (hardened-by-default):
    /// - `governance.locking = Required` and `allow_unlocked_commit = false`
    /// - `execution.in_doubt = Halt`
    /// - supply pre-check and live balance verification
    ///
    /// Notes:
    /// - In Commit mode, absence of a `LockManager` yields an early `run.attempt` failure
    ///   with `error_id=E_LOCKING` (`exit_code=30`).
    ///
    /// # Example
    /// ```rust
    /// use tokenrail::policy::Policy;
    /// use tokenrail::{Orchestrator, logging::JsonlSink};
    /// use tokenrail::adapters::FileLockManager;
    ///
    /// let policy = Policy::production_preset();
    /// let api = Orchestrator::new(JsonlSink::default(), JsonlSink::default(), policy)
    ///     .with_lock_manager(Box::new(FileLockManager::new(std::path::PathBuf::from("/tmp/tokenrail.lock"))));
    /// # let _ = api;
    /// ```
    #[must_use]
    pub fn production_preset() -> Self {
        let mut p = Self::default();
        p.apply_production_preset();
        p
    }

    /// Mutate this Policy to apply the recommended **production defaults**.
    pub fn apply_production_preset(&mut self) -> &mut Self {
        self.governance.locking = LockingPolicy::Required;
        self.governance.allow_unlocked_commit = false;
        self.execution.in_doubt = InDoubtPolicy::Halt;
        self.verification.precheck_supply = true;
        self.verification.verify_live_balances = true;
        self
    }

    /// Parse a policy from YAML; absent groups and fields keep their defaults.
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        serde_yaml::from_str(s).map_err(|e| Error {
            kind: ErrorKind::InvalidValue,
            msg: format!("policy: {e}"),
        })
    }
}
