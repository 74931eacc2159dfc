//! Per-action state machine: `Pending -> Submitted -> {Confirmed | Failed}`.
//!
//! Runs on worker threads, so it never emits facts; the coordinator reports
//! each returned `ActionOutcome`. Every runtime failure is written to the
//! journal before it is returned.
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crate::adapters::{Ledger, LedgerError};
use crate::api::errors::map::{map_ledger_error, map_resolve_error};
use crate::api::errors::{id_str, ErrorId};
use crate::constants::DEFAULT_SIGNER;
use crate::journal::Journal;
use crate::policy::{InDoubtPolicy, Policy};
use crate::resolve::{resolve_action, Resolved};
use crate::types::{
    Action, ActionId, ActionKind, ActionOutcome, ExecutionRecord, LogEntry, LogEvent,
    OutcomeState, Status, Value,
};

/// Submission log shared by the workers of one run.
#[derive(Default)]
pub(crate) struct RunLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl RunLog {
    pub(crate) fn push(&self, action: &ActionId, event: LogEvent) {
        let mut g = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let seq = g.len() as u64;
        g.push(LogEntry {
            seq,
            action: action.clone(),
            event,
        });
    }

    pub(crate) fn into_entries(self) -> Vec<LogEntry> {
        self.entries
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Everything a worker needs; shared by reference across threads.
pub(crate) struct Env<'a> {
    pub journal: &'a dyn Journal,
    pub ledger: Option<&'a dyn Ledger>,
    pub policy: &'a Policy,
    pub log: &'a RunLog,
}

pub(crate) fn outcome(action: &Action, state: OutcomeState, attempts: u32) -> ActionOutcome {
    ActionOutcome {
        id: action.id.clone(),
        kind: action.kind,
        label: action.label.clone(),
        state,
        attempts,
        result: None,
        error: None,
        error_id: None,
    }
}

pub(crate) fn failed(action: &Action, attempts: u32, error: String, id: ErrorId) -> ActionOutcome {
    ActionOutcome {
        error: Some(error),
        error_id: Some(id_str(id).to_string()),
        ..outcome(action, OutcomeState::Failed, attempts)
    }
}

fn in_doubt(action: &Action, attempts: u32) -> ActionOutcome {
    ActionOutcome {
        error: Some(format!(
            "left submitted by an earlier run after {attempts} attempt(s); on-chain state unknown"
        )),
        error_id: Some(id_str(ErrorId::E_IN_DOUBT).to_string()),
        ..outcome(action, OutcomeState::InDoubt, attempts)
    }
}

/// Dry-run view of one action: what a commit run would do with it right now.
pub(crate) fn preview(env: &Env<'_>, action: &Action) -> ActionOutcome {
    match env.journal.get(&action.id) {
        Ok(Some(r)) if r.is_confirmed() => {
            env.log.push(&action.id, LogEvent::Skipped);
            ActionOutcome {
                result: r.result().map(<[Value]>::to_vec),
                ..outcome(action, OutcomeState::AlreadyConfirmed, r.attempts())
            }
        }
        Ok(Some(r))
            if r.status() == Status::Submitted
                && action.kind.is_transaction()
                && env.policy.execution.in_doubt == InDoubtPolicy::Halt =>
        {
            in_doubt(action, r.attempts())
        }
        Ok(_) => outcome(action, OutcomeState::WouldSubmit, 0),
        Err(e) => failed(action, 0, e.to_string(), ErrorId::E_JOURNAL),
    }
}

/// Drive one action to a terminal state for this run.
pub(crate) fn execute(env: &Env<'_>, action: &Action) -> ActionOutcome {
    let existing = match env.journal.get(&action.id) {
        Ok(r) => r,
        Err(e) => return failed(action, 0, e.to_string(), ErrorId::E_JOURNAL),
    };
    let prior = existing.as_ref().map_or(0, ExecutionRecord::attempts);
    match existing.as_ref().map(ExecutionRecord::status) {
        Some(Status::Confirmed) => {
            env.log.push(&action.id, LogEvent::Skipped);
            return ActionOutcome {
                result: existing
                    .as_ref()
                    .and_then(ExecutionRecord::result)
                    .map(<[Value]>::to_vec),
                ..outcome(action, OutcomeState::AlreadyConfirmed, prior)
            };
        }
        Some(Status::Submitted)
            if action.kind.is_transaction()
                && env.policy.execution.in_doubt == InDoubtPolicy::Halt =>
        {
            return in_doubt(action, prior);
        }
        _ => {}
    }

    let Some(ledger) = env.ledger else {
        return failed(action, 0, "no ledger configured".into(), ErrorId::E_GENERIC);
    };

    let resolved = match resolve_action(action, env.journal) {
        Ok(r) => r,
        Err(e) => {
            let id = map_resolve_error(&e);
            let msg = e.to_string();
            return record_failure(env, action, prior, 0, msg, id);
        }
    };

    let timeout_ms = env.policy.timeouts.confirm_timeout_ms;
    let max_attempts = env.policy.retry.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let total = prior.saturating_add(attempt);
        // Reads change nothing on chain, so they never become in-doubt.
        if action.kind.is_transaction() {
            if let Err(e) = env.journal.put(&action.id, ExecutionRecord::submitted(total)) {
                return failed(action, attempt - 1, e.to_string(), ErrorId::E_JOURNAL);
            }
        }
        env.log.push(&action.id, LogEvent::Submitted { attempt });

        match send(ledger, action, &resolved, timeout_ms) {
            Ok((values, tx_hash)) => {
                let check = action
                    .expect
                    .as_ref()
                    .map_or(Ok(()), |exp| exp.check(&values));
                if let Err(msg) = &check {
                    if !action.kind.is_transaction() {
                        return record_failure(
                            env,
                            action,
                            total,
                            attempt,
                            msg.clone(),
                            ErrorId::E_VERIFY,
                        );
                    }
                }
                let rec = ExecutionRecord::confirmed(values.clone(), tx_hash, total);
                if let Err(e) = env.journal.put(&action.id, rec) {
                    return failed(action, attempt, e.to_string(), ErrorId::E_JOURNAL);
                }
                env.log.push(&action.id, LogEvent::Confirmed);
                // The transaction is final on chain; only this run's outcome reports the mismatch.
                if let Err(msg) = check {
                    return ActionOutcome {
                        result: Some(values),
                        ..failed(action, attempt, msg, ErrorId::E_VERIFY)
                    };
                }
                return ActionOutcome {
                    result: Some(values),
                    ..outcome(action, OutcomeState::Confirmed, attempt)
                };
            }
            Err(e) if e.is_transient() && attempt < max_attempts => {
                env.log.push(
                    &action.id,
                    LogEvent::Retrying {
                        attempt,
                        error: e.to_string(),
                    },
                );
                let delay = env.policy.retry.backoff_ms(attempt);
                if delay > 0 {
                    thread::sleep(Duration::from_millis(delay));
                }
            }
            Err(e) => {
                let id = map_ledger_error(&e);
                let msg = match e {
                    LedgerError::Transient(_) | LedgerError::Timeout(_) => {
                        format!("{e} (gave up after {attempt} attempts)")
                    }
                    LedgerError::Rejected(_) => e.to_string(),
                };
                return record_failure(env, action, total, attempt, msg, id);
            }
        }
    }
}

fn record_failure(
    env: &Env<'_>,
    action: &Action,
    total: u32,
    attempt: u32,
    msg: String,
    id: ErrorId,
) -> ActionOutcome {
    if let Err(e) = env
        .journal
        .put(&action.id, ExecutionRecord::failed(msg.clone(), id_str(id), total))
    {
        return failed(
            action,
            attempt,
            format!("{msg}; journal write failed: {e}"),
            ErrorId::E_JOURNAL,
        );
    }
    env.log.push(&action.id, LogEvent::Failed { error: msg.clone() });
    failed(action, attempt, msg, id)
}

fn send(
    ledger: &dyn Ledger,
    action: &Action,
    resolved: &Resolved,
    timeout_ms: u64,
) -> Result<(Vec<Value>, Option<String>), LedgerError> {
    let signer = action.signer.as_deref().unwrap_or(DEFAULT_SIGNER);
    match resolved {
        Resolved::Deploy { contract, args } => ledger
            .deploy(signer, contract, args, timeout_ms)
            .map(|r| (r.values, r.tx_hash)),
        Resolved::Invoke {
            instance,
            method,
            args,
        } => match action.kind {
            ActionKind::StaticCall => ledger
                .static_call(*instance, method, args, timeout_ms)
                .map(|v| (v, None)),
            ActionKind::Call | ActionKind::Deploy => ledger
                .call(signer, *instance, method, args, timeout_ms)
                .map(|r| (r.values, r.tx_hash)),
        },
    }
}
