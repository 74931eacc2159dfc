use log::Level;

use crate::api::precheck;
use crate::api::Orchestrator;
use crate::logging::{AuditSink, FactsEmitter, StageLogger};
use crate::types::{Plan, SupplyCheck};

pub(crate) enum Gate {
    /// Carries the balanced check, or `None` when the pre-check is off or the plan has no total.
    Pass(Option<SupplyCheck>),
    Stop(SupplyCheck),
}

/// Supply gate, run before any ledger call.
pub(crate) fn enforce<E: FactsEmitter, A: AuditSink>(
    api: &Orchestrator<E, A>,
    plan: &Plan,
    slog: &StageLogger<'_>,
) -> Gate {
    if !api.policy.verification.precheck_supply {
        return Gate::Pass(None);
    }
    let check = precheck::supply_check(plan);
    precheck::emit(slog, check.as_ref());
    match check {
        Some(c) if !c.is_balanced() => {
            api.audit.log(
                Level::Error,
                &format!("run: supply pre-check failed: {}", c.describe()),
            );
            Gate::Stop(c)
        }
        other => Gate::Pass(other),
    }
}
