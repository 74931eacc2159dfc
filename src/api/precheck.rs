use log::Level;
use serde_json::json;

use crate::api::errors::ErrorId;
use crate::api::Orchestrator;
use crate::logging::audit::{AuditCtx, AuditMode};
use crate::logging::{now_iso, AuditSink, FactsEmitter, StageLogger};
use crate::types::ids::{new_run_id, plan_id};
use crate::types::{Amount, Plan, SupplyCheck, VerificationReport};

/// Sum of the plan's allocation amounts against its expected total.
///
/// `None` when the plan declares no expected total. Allocations are validated
/// against overflow at construction, so the sum saturates only for plans built
/// by hand.
#[must_use]
pub fn supply_check(plan: &Plan) -> Option<SupplyCheck> {
    let expected = plan.expected_total()?;
    let distributed = plan
        .allocations()
        .iter()
        .fold(Amount::ZERO, |acc, a| {
            acc.checked_add(a.amount).unwrap_or(Amount(u128::MAX))
        });
    let names = plan.allocations().iter().map(|a| a.name.clone()).collect();
    Some(SupplyCheck::new(expected, distributed, names))
}

/// Emit the `precheck` fact for a supply check. Shared by the standalone
/// pre-check and the run gate.
pub(crate) fn emit(slog: &StageLogger<'_>, check: Option<&SupplyCheck>) {
    let Some(check) = check else {
        slog.precheck().field("supply", json!("skipped")).emit_success();
        return;
    };
    let fields = json!({
        "expected_total": check.expected.to_string(),
        "distributed": check.distributed.to_string(),
        "delta": check.delta,
        "allocations": check.allocations,
    });
    if check.is_balanced() {
        slog.precheck().merge(&fields).emit_success();
    } else {
        slog.precheck()
            .merge(&fields)
            .field("error", json!(check.describe()))
            .error_id(ErrorId::E_SUPPLY_MISMATCH)
            .emit_failure();
    }
}

pub(crate) fn run<E: FactsEmitter, A: AuditSink>(
    api: &Orchestrator<E, A>,
    plan: &Plan,
) -> VerificationReport {
    let tctx = AuditCtx::new(
        &api.facts as &dyn FactsEmitter,
        plan.name().to_string(),
        plan_id(plan).to_string(),
        new_run_id(),
        now_iso(),
        AuditMode::default(),
    );
    let supply = supply_check(plan);
    emit(&StageLogger::new(&tctx), supply.as_ref());
    if let Some(s) = supply.as_ref().filter(|s| !s.is_balanced()) {
        api.audit
            .log(Level::Error, &format!("precheck: {}", s.describe()));
    }
    VerificationReport {
        supply,
        ..VerificationReport::default()
    }
}
