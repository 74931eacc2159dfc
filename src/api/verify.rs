//! Invariant verifier.
//!
//! Combines the static supply check with the balance reads recorded in the
//! journal. A balance read that never confirmed is reported as `Missing`;
//! the live total is only computed when every recipient has been observed.
use log::Level;
use serde_json::json;

use crate::api::errors::{ApiError, ErrorId};
use crate::api::Orchestrator;
use crate::journal::{Journal, JournalError};
use crate::logging::audit::{AuditCtx, AuditMode};
use crate::logging::{now_iso, AuditSink, FactsEmitter, StageLogger};
use crate::types::ids::{new_run_id, plan_id};
use crate::types::{
    Amount, BalanceFinding, FindingStatus, Plan, SupplyCheck, Value, VerificationReport,
};

use super::precheck::supply_check;

pub(crate) fn evaluate(plan: &Plan, journal: &dyn Journal) -> Result<VerificationReport, JournalError> {
    let mut balances = Vec::with_capacity(plan.balance_checks().len());
    for check in plan.balance_checks() {
        let observed = journal
            .get(&check.action)?
            .filter(|r| r.is_confirmed())
            .and_then(|r| r.result().and_then(|v| v.first().and_then(Value::as_uint)))
            .map(Amount);
        let status = match observed {
            None => FindingStatus::Missing,
            Some(o) if o == check.expected => FindingStatus::Match,
            Some(_) => FindingStatus::Mismatch,
        };
        balances.push(BalanceFinding {
            action: check.action.clone(),
            recipient: check.recipient.clone(),
            expected: check.expected,
            observed,
            allocations: check.allocations.clone(),
            status,
        });
    }

    let live_total = match plan.expected_total() {
        Some(expected) if !balances.is_empty() => balances
            .iter()
            .map(|b| b.observed)
            .try_fold(Amount::ZERO, |acc, o| o.and_then(|o| acc.checked_add(o)))
            .map(|sum| {
                let recipients = balances.iter().map(|b| b.recipient.clone()).collect();
                SupplyCheck::new(expected, sum, recipients)
            }),
        _ => None,
    };

    Ok(VerificationReport {
        supply: supply_check(plan),
        balances,
        live_total,
    })
}

/// Emit the `verify.result` fact for a finished report.
pub(crate) fn emit(slog: &StageLogger<'_>, report: &VerificationReport) {
    let summary = json!({
        "balances_checked": report.balances.len(),
        "mismatches": report.balances.iter().filter(|b| b.status == FindingStatus::Mismatch).count(),
        "missing": report.balances.iter().filter(|b| b.status == FindingStatus::Missing).count(),
        "live_total_balanced": report.live_total.as_ref().map(SupplyCheck::is_balanced),
    });
    if report.ok() {
        slog.verify_result().merge(&summary).emit_success();
    } else {
        slog.verify_result()
            .merge(&summary)
            .field("problems", json!(report.problems()))
            .error_id(ErrorId::E_VERIFY)
            .emit_failure();
    }
}

pub(crate) fn run<E: FactsEmitter, A: AuditSink>(
    api: &Orchestrator<E, A>,
    plan: &Plan,
    journal: &dyn Journal,
) -> Result<VerificationReport, ApiError> {
    let tctx = AuditCtx::new(
        &api.facts as &dyn FactsEmitter,
        plan.name().to_string(),
        plan_id(plan).to_string(),
        new_run_id(),
        now_iso(),
        AuditMode::default(),
    );
    let report = evaluate(plan, journal)?;
    emit(&StageLogger::new(&tctx), &report);
    for p in report.problems() {
        api.audit.log(Level::Warn, &format!("verify: {p}"));
    }
    Ok(report)
}
