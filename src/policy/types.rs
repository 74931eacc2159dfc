use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKOFF_BASE_MS, DEFAULT_BACKOFF_MAX_MS, DEFAULT_CONFIRM_TIMEOUT_MS,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_WORKERS,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockingPolicy {
    Required,
    Optional,
}

/// How ready actions are dispatched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Concurrency {
    /// One action at a time, in schedule order.
    Serial,
    /// Waves of independent actions on up to `max_workers` threads; one signer never
    /// has two transactions in flight.
    PerSigner { max_workers: usize },
}

/// What to do after an action fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop issuing new submissions.
    Halt,
    /// Keep going with actions that do not transitively depend on the failure.
    ContinueIndependent,
}

/// What to do with a record an earlier run left in `Submitted`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InDoubtPolicy {
    Halt,
    Resubmit,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Retry {
    /// Dispatches per action per run, including the first.
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for Retry {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
        }
    }
}

impl Retry {
    /// Delay before retry number `retry` (1-based): base doubled each time, capped.
    #[must_use]
    pub fn backoff_ms(&self, retry: u32) -> u64 {
        let shift = retry.saturating_sub(1).min(32);
        self.backoff_base_ms
            .saturating_mul(1u64 << shift)
            .min(self.backoff_max_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub confirm_timeout_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            confirm_timeout_ms: DEFAULT_CONFIRM_TIMEOUT_MS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Execution {
    pub concurrency: Concurrency,
    pub on_failure: FailurePolicy,
    pub in_doubt: InDoubtPolicy,
}

impl Default for Execution {
    fn default() -> Self {
        Self {
            concurrency: Concurrency::Serial,
            on_failure: FailurePolicy::Halt,
            in_doubt: InDoubtPolicy::Halt,
        }
    }
}

impl Execution {
    #[must_use]
    pub fn per_signer() -> Self {
        Self {
            concurrency: Concurrency::PerSigner {
                max_workers: DEFAULT_MAX_WORKERS,
            },
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Verification {
    /// Refuse to touch the ledger when allocations do not sum to the expected total.
    pub precheck_supply: bool,
    /// Check recorded balance reads after a clean commit run.
    pub verify_live_balances: bool,
}

impl Default for Verification {
    fn default() -> Self {
        Self {
            precheck_supply: true,
            verify_live_balances: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Governance {
    pub locking: LockingPolicy,
    pub allow_unlocked_commit: bool,
}

impl Default for Governance {
    fn default() -> Self {
        Self {
            locking: LockingPolicy::Optional,
            allow_unlocked_commit: true,
        }
    }
}
