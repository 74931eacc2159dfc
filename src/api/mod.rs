// Facade for API module; delegates to submodules under src/api/

use std::sync::Arc;

use crate::adapters::{Ledger, LockManager};
use crate::constants::DEFAULT_LOCK_TIMEOUT_MS;
use crate::journal::Journal;
use crate::logging::{AuditSink, FactsEmitter};
use crate::policy::Policy;
use crate::types::{CampaignSpec, Plan, RunMode, RunReport, VerificationReport};

pub mod errors;
mod plan;
mod precheck;
mod run;
mod verify;

pub use precheck::supply_check;

/// Entry point for planning, executing and verifying a distribution campaign.
///
/// The orchestrator owns the fact and audit sinks, the policy, and the
/// collaborators a commit run needs: a [`Ledger`] and, optionally, a
/// [`LockManager`]. Dry runs need neither.
pub struct Orchestrator<E: FactsEmitter, A: AuditSink> {
    facts: E,
    audit: A,
    policy: Policy,
    ledger: Option<Arc<dyn Ledger>>, // None for planning and dry runs
    lock: Option<Box<dyn LockManager>>, // None in dev/test; required in production
    lock_timeout_ms: u64,
}

impl<E: FactsEmitter, A: AuditSink> Orchestrator<E, A> {
    pub fn new(facts: E, audit: A, policy: Policy) -> Self {
        Self {
            facts,
            audit,
            policy,
            ledger: None,
            lock: None,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    #[must_use]
    pub fn with_ledger(mut self, ledger: Arc<dyn Ledger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    #[must_use]
    pub fn with_lock_manager(mut self, lock: Box<dyn LockManager>) -> Self {
        self.lock = Some(lock);
        self
    }

    #[must_use]
    pub const fn with_lock_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    #[must_use]
    pub const fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Build the action graph for a campaign.
    ///
    /// # Errors
    /// Returns `ApiError::Construction` when the campaign is invalid; no partial plan is produced.
    pub fn plan(&self, spec: &CampaignSpec) -> Result<Plan, errors::ApiError> {
        plan::build(self, spec)
    }

    /// Static supply check of a plan. Never touches a ledger or journal.
    pub fn precheck(&self, plan: &Plan) -> VerificationReport {
        precheck::run(self, plan)
    }

    /// Execute (or, in `RunMode::DryRun`, walk) a plan against a journal.
    ///
    /// Action-level failures are recorded in the journal and reported in the
    /// returned `RunReport`; only setup problems surface as `Err`.
    ///
    /// # Errors
    /// Returns an error when the journal belongs to another campaign, when a commit
    /// run has no ledger, or when the journal cannot be bound to the plan.
    pub fn run(
        &self,
        plan: &Plan,
        journal: &dyn Journal,
        mode: RunMode,
    ) -> Result<RunReport, errors::ApiError> {
        run::run(self, plan, journal, mode)
    }

    /// Supply pre-check plus the balances recorded in the journal.
    ///
    /// # Errors
    /// Returns `ApiError::Journal` when the journal cannot be read.
    pub fn verify(
        &self,
        plan: &Plan,
        journal: &dyn Journal,
    ) -> Result<VerificationReport, errors::ApiError> {
        verify::run(self, plan, journal)
    }
}
