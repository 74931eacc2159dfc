//! Run stage: walks the plan in dependency order against a journal and a ledger.
//!
//! Side-effects:
//! - Emits facts for `run.attempt`, `precheck`, `action.attempt`/`action.result`
//!   per action, `verify.result`, and a final `run.result` summary.
//! - Enforces locking policy and maps failures to `E_LOCKING` with bounded wait.
//! - Refuses to touch the ledger when the supply pre-check fails (`E_SUPPLY_MISMATCH`).
//! - Writes every state transition to the journal before reporting it.
//!
//! Facts are emitted from the coordinating thread only; workers return outcomes.

use std::thread;
use std::time::Instant;

use log::Level;
use serde_json::json;

use crate::api::errors::{exit_code_for_id_str, id_str, ApiError, ErrorId};
use crate::api::Orchestrator;
use crate::graph::{schedule, waves};
use crate::journal::Journal;
use crate::logging::audit::{AuditCtx, AuditMode};
use crate::logging::{ts_for_mode, AuditSink, FactsEmitter, StageLogger};
use crate::policy::{Concurrency, FailurePolicy};
use crate::types::ids::{new_run_id, plan_id};
use crate::types::{
    ActionOutcome, OutcomeState, Plan, RunMode, RunReport, SupplyCheck, VerificationReport,
};

use super::verify;

mod dispatch;
mod gate;
mod lock;
mod summary;

use dispatch::{Env, RunLog};
use summary::RunSummary;

fn elapsed_ms(t0: Instant) -> u64 {
    u64::try_from(t0.elapsed().as_millis()).unwrap_or(u64::MAX)
}

pub(crate) fn run<E: FactsEmitter, A: AuditSink>(
    api: &Orchestrator<E, A>,
    plan: &Plan,
    journal: &dyn Journal,
    mode: RunMode,
) -> Result<RunReport, ApiError> {
    let t0 = Instant::now();
    let dry = mode == RunMode::DryRun;
    if journal.campaign() != plan.name() {
        return Err(ApiError::CampaignMismatch {
            journal: journal.campaign().to_string(),
            plan: plan.name().to_string(),
        });
    }
    let ledger = api.ledger.as_deref();
    if !dry && ledger.is_none() {
        return Err(ApiError::LedgerMissing);
    }

    let pid = plan_id(plan);
    let run_id = new_run_id();
    let tctx = AuditCtx::new(
        &api.facts as &dyn FactsEmitter,
        plan.name().to_string(),
        pid.to_string(),
        run_id.clone(),
        ts_for_mode(mode),
        AuditMode {
            dry_run: dry,
            redact: dry,
        },
    );
    let slog = StageLogger::new(&tctx);
    let mut report = RunReport {
        campaign: plan.name().to_string(),
        plan_uuid: Some(pid),
        run_id,
        mode,
        ..RunReport::default()
    };

    api.audit.log(Level::Info, "run: starting");
    let linfo = lock::acquire(api, mode, &slog);
    let _lock_guard = linfo.guard;
    let summary = RunSummary::new(&linfo.lock_backend, linfo.lock_wait_ms);
    if let Some(msg) = linfo.failure {
        return Ok(stop(report, plan, t0, ErrorId::E_LOCKING, msg, None, summary, &slog));
    }
    slog.run_attempt()
        .merge(&json!({
            "lock_backend": linfo.lock_backend,
            "lock_wait_ms": linfo.lock_wait_ms,
            "lock_attempts": linfo.approx_attempts,
            "actions": plan.len(),
        }))
        .emit_success();

    let supply = match gate::enforce(api, plan, &slog) {
        gate::Gate::Pass(s) => s,
        gate::Gate::Stop(check) => {
            let msg = format!("supply pre-check failed: {}", check.describe());
            return Ok(stop(
                report,
                plan,
                t0,
                ErrorId::E_SUPPLY_MISMATCH,
                msg,
                Some(check),
                summary,
                &slog,
            ));
        }
    };

    if !dry {
        if let Some(prev) = journal.bind_plan(&pid.to_string())? {
            slog.run_attempt()
                .merge(&json!({
                    "plan_changed": true,
                    "previous_plan_id": prev,
                }))
                .emit_warn();
            api.audit.log(
                Level::Warn,
                &format!("run: journal was written by plan {prev}; resuming under {pid}"),
            );
        }
    }

    let log = RunLog::default();
    let env = Env {
        journal,
        ledger,
        policy: &api.policy,
        log: &log,
    };
    let batches: Vec<Vec<usize>> = match (mode, api.policy.execution.concurrency) {
        (RunMode::Commit, Concurrency::PerSigner { max_workers }) => waves(plan, true)
            .into_iter()
            .flat_map(|w| {
                w.chunks(max_workers.max(1))
                    .map(<[usize]>::to_vec)
                    .collect::<Vec<_>>()
            })
            .collect(),
        _ => schedule(plan).into_iter().map(|i| vec![i]).collect(),
    };

    let mut outcomes: Vec<Option<ActionOutcome>> = vec![None; plan.len()];
    let mut halted = false;
    for batch in batches {
        let mut runnable = Vec::with_capacity(batch.len());
        for i in batch {
            if halted || (!dry && blocked(plan, i, &outcomes)) {
                let o = dispatch::outcome(&plan.actions()[i], OutcomeState::NotAttempted, 0);
                report_action(&slog, &o);
                outcomes[i] = Some(o);
            } else {
                slog.action_attempt()
                    .action(plan.actions()[i].id.as_str())
                    .field("kind", json!(plan.actions()[i].kind))
                    .emit_success();
                runnable.push(i);
            }
        }

        let results = if dry {
            runnable
                .iter()
                .map(|&i| (i, dispatch::preview(&env, &plan.actions()[i])))
                .collect()
        } else {
            execute_batch(&env, plan, &runnable)
        };

        for (i, o) in results {
            report_action(&slog, &o);
            if matches!(o.state, OutcomeState::Failed | OutcomeState::InDoubt) {
                if let Some(e) = &o.error {
                    report.errors.push(format!("{}: {e}", o.id));
                }
                if report.error_id.is_none() {
                    report.error_id.clone_from(&o.error_id);
                }
                api.audit
                    .log(Level::Error, &format!("run: {} {}", o.id, o.state.as_str()));
                if o.state == OutcomeState::InDoubt
                    || api.policy.execution.on_failure == FailurePolicy::Halt
                {
                    halted = true;
                }
            }
            outcomes[i] = Some(o);
        }
    }

    report.outcomes = outcomes
        .into_iter()
        .zip(plan.actions())
        .map(|(o, a)| o.unwrap_or_else(|| dispatch::outcome(a, OutcomeState::NotAttempted, 0)))
        .collect();
    report.log = log.into_entries();

    let clean = report.error_id.is_none() && report.errors.is_empty();
    report.verification = if !dry && clean && api.policy.verification.verify_live_balances {
        match verify::evaluate(plan, journal) {
            Ok(v) => {
                verify::emit(&slog, &v);
                if !v.ok() {
                    report.errors.extend(v.problems());
                    report.error_id = Some(id_str(ErrorId::E_VERIFY).to_string());
                }
                Some(v)
            }
            Err(e) => {
                report.errors.push(format!("verification: {e}"));
                report.error_id = Some(id_str(ErrorId::E_JOURNAL).to_string());
                supply_only(supply)
            }
        }
    } else {
        supply_only(supply)
    };

    report.duration_ms = elapsed_ms(t0);
    let ok = report.ok();
    summary
        .counts(&report.outcomes)
        .duration_ms(report.duration_ms)
        .errors(report.error_id.as_deref(), &report.outcomes)
        .emit(&slog, ok);
    api.audit.log(
        if ok { Level::Info } else { Level::Error },
        &format!("run: finished ({})", if ok { "pass" } else { "fail" }),
    );
    Ok(report)
}

/// Run a batch: inline when it holds one action, otherwise one scoped thread per action.
fn execute_batch(env: &Env<'_>, plan: &Plan, batch: &[usize]) -> Vec<(usize, ActionOutcome)> {
    if let [i] = batch {
        return vec![(*i, dispatch::execute(env, &plan.actions()[*i]))];
    }
    thread::scope(|s| {
        let handles: Vec<_> = batch
            .iter()
            .map(|&i| {
                let action = &plan.actions()[i];
                (i, action, s.spawn(move || dispatch::execute(env, action)))
            })
            .collect();
        handles
            .into_iter()
            .map(|(i, action, h)| {
                let o = h.join().unwrap_or_else(|_| {
                    dispatch::failed(action, 0, "worker panicked".into(), ErrorId::E_GENERIC)
                });
                (i, o)
            })
            .collect()
    })
}

/// An action is blocked when any dependency did not end up confirmed.
fn blocked(plan: &Plan, i: usize, outcomes: &[Option<ActionOutcome>]) -> bool {
    plan.actions()[i].depends_on.iter().any(|d| {
        plan.position(d)
            .and_then(|j| outcomes[j].as_ref())
            .map_or(true, |o| !o.state.is_done())
    })
}

fn supply_only(supply: Option<SupplyCheck>) -> Option<VerificationReport> {
    supply.map(|s| VerificationReport {
        supply: Some(s),
        ..VerificationReport::default()
    })
}

fn report_action(slog: &StageLogger<'_>, o: &ActionOutcome) {
    let ev = slog
        .action_result()
        .action(o.id.as_str())
        .merge(&json!({
            "kind": o.kind,
            "state": o.state.as_str(),
            "attempts": o.attempts,
        }));
    match o.state {
        OutcomeState::Failed | OutcomeState::InDoubt => {
            let id = o.error_id.as_deref().unwrap_or("E_GENERIC");
            ev.merge(&json!({
                "error": o.error,
                "error_id": id,
                "exit_code": exit_code_for_id_str(id).unwrap_or(1),
            }))
            .emit_failure();
        }
        OutcomeState::NotAttempted => ev.emit_warn(),
        OutcomeState::Confirmed | OutcomeState::AlreadyConfirmed | OutcomeState::WouldSubmit => {
            ev.emit_success();
        }
    }
}

/// Early exit before any ledger call: every action is reported as not attempted.
#[allow(clippy::too_many_arguments)]
fn stop(
    mut report: RunReport,
    plan: &Plan,
    t0: Instant,
    id: ErrorId,
    msg: String,
    supply: Option<SupplyCheck>,
    summary: RunSummary,
    slog: &StageLogger<'_>,
) -> RunReport {
    report.outcomes = plan
        .actions()
        .iter()
        .map(|a| dispatch::outcome(a, OutcomeState::NotAttempted, 0))
        .collect();
    report.errors.push(msg);
    report.error_id = Some(id_str(id).to_string());
    report.verification = supply_only(supply);
    report.duration_ms = elapsed_ms(t0);
    summary
        .counts(&report.outcomes)
        .duration_ms(report.duration_ms)
        .errors(report.error_id.as_deref(), &report.outcomes)
        .emit(slog, false);
    report
}
