use crate::types::plan::RunMode;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const TS_ZERO: &str = "1970-01-01T00:00:00Z";

pub fn now_iso() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| TS_ZERO.to_string())
}

/// Return a timestamp for facts emission based on mode.
/// - DryRun: constant zero timestamp for determinism.
/// - Commit: real, current timestamp in RFC3339.
pub fn ts_for_mode(mode: RunMode) -> String {
    match mode {
        RunMode::DryRun => TS_ZERO.to_string(),
        RunMode::Commit => now_iso(),
    }
}

/// Apply redactions to a fact event so dry-run output is stable across runs.
/// Zeroes the timestamp and drops fields that depend on wall-clock time or
/// on the remote ledger.
pub fn redact_event(mut v: Value) -> Value {
    if let Some(obj) = v.as_object_mut() {
        obj.insert("ts".into(), Value::String(TS_ZERO.to_string()));
        obj.remove("duration_ms");
        obj.remove("lock_wait_ms");
        obj.remove("attempts");
        obj.remove("tx_hash");
        // run ids are random per invocation
        if obj.contains_key("run_id") {
            obj.insert("run_id".into(), Value::String("***".into()));
        }
    }
    v
}
