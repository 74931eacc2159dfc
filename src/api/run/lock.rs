use std::time::Instant;

use log::Level;
use serde_json::json;

use crate::adapters::LockGuard;
use crate::api::errors::ErrorId;
use crate::api::Orchestrator;
use crate::constants::LOCK_POLL_MS;
use crate::logging::{AuditSink, FactsEmitter, StageLogger};
use crate::policy::LockingPolicy;
use crate::types::RunMode;

pub(crate) struct LockInfo {
    pub lock_backend: String,
    pub lock_wait_ms: Option<u64>,
    pub approx_attempts: u64,
    pub guard: Option<Box<dyn LockGuard>>,
    /// Set when the run must stop before touching the ledger.
    pub failure: Option<String>,
}

fn elapsed_ms(t: Instant) -> u64 {
    u64::try_from(t.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Acquire the process lock for a commit run, honoring the governance policy.
/// Dry runs never lock.
pub(crate) fn acquire<E: FactsEmitter, A: AuditSink>(
    api: &Orchestrator<E, A>,
    mode: RunMode,
    slog: &StageLogger<'_>,
) -> LockInfo {
    let lock_backend = if api.lock.is_some() { "file" } else { "none" }.to_string();
    if mode == RunMode::DryRun {
        return LockInfo {
            lock_backend,
            lock_wait_ms: None,
            approx_attempts: 0,
            guard: None,
            failure: None,
        };
    }

    if let Some(mgr) = &api.lock {
        let lt0 = Instant::now();
        let res = mgr.acquire_process_lock(api.lock_timeout_ms);
        let lock_wait_ms = Some(elapsed_ms(lt0));
        let approx_attempts = lock_wait_ms.map_or(1, |ms| 1 + ms / LOCK_POLL_MS);
        return match res {
            Ok(g) => LockInfo {
                lock_backend,
                lock_wait_ms,
                approx_attempts,
                guard: Some(g),
                failure: None,
            },
            Err(e) => {
                emit_failure(slog, &lock_backend, lock_wait_ms, approx_attempts);
                api.audit
                    .log(Level::Error, "run: lock acquisition failed (E_LOCKING)");
                LockInfo {
                    lock_backend,
                    lock_wait_ms,
                    approx_attempts,
                    guard: None,
                    failure: Some(format!("lock: {e}")),
                }
            }
        };
    }

    let governance = &api.policy.governance;
    if matches!(governance.locking, LockingPolicy::Required) || !governance.allow_unlocked_commit {
        emit_failure(slog, "none", None, 0);
        api.audit
            .log(Level::Error, "run: lock manager required in commit mode (E_LOCKING)");
        return LockInfo {
            lock_backend,
            lock_wait_ms: None,
            approx_attempts: 0,
            guard: None,
            failure: Some("lock manager required in commit mode".to_string()),
        };
    }

    slog.run_attempt()
        .merge(&json!({
            "lock_backend": "none",
            "no_lock_manager": true,
            "lock_attempts": 0u64,
        }))
        .emit_warn();
    LockInfo {
        lock_backend,
        lock_wait_ms: None,
        approx_attempts: 0,
        guard: None,
        failure: None,
    }
}

fn emit_failure(slog: &StageLogger<'_>, backend: &str, wait_ms: Option<u64>, attempts: u64) {
    slog.run_attempt()
        .merge(&json!({
            "lock_backend": backend,
            "lock_wait_ms": wait_ms,
            "lock_attempts": attempts,
        }))
        .error_id(ErrorId::E_LOCKING)
        .emit_failure();
}
