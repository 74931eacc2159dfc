use serde_json::{json, Value};

use crate::api::errors::exit_code_for_id_str;
use crate::logging::StageLogger;
use crate::types::{ActionOutcome, OutcomeState};

/// Fields of the final `run.result` fact.
pub(crate) struct RunSummary {
    fields: Value,
}

impl RunSummary {
    pub(crate) fn new(lock_backend: &str, lock_wait_ms: Option<u64>) -> Self {
        let fields = json!({
            "lock_backend": lock_backend,
            "lock_wait_ms": lock_wait_ms,
        });
        Self { fields }
    }

    pub(crate) fn counts(mut self, outcomes: &[ActionOutcome]) -> Self {
        let count = |s: OutcomeState| outcomes.iter().filter(|o| o.state == s).count();
        if let Some(obj) = self.fields.as_object_mut() {
            obj.insert(
                "counts".to_string(),
                json!({
                    "total": outcomes.len(),
                    "confirmed": count(OutcomeState::Confirmed),
                    "already_confirmed": count(OutcomeState::AlreadyConfirmed),
                    "failed": count(OutcomeState::Failed),
                    "in_doubt": count(OutcomeState::InDoubt),
                    "not_attempted": count(OutcomeState::NotAttempted),
                    "would_submit": count(OutcomeState::WouldSubmit),
                }),
            );
        }
        self
    }

    pub(crate) fn duration_ms(mut self, ms: u64) -> Self {
        if let Some(obj) = self.fields.as_object_mut() {
            obj.insert("duration_ms".to_string(), json!(ms));
        }
        self
    }

    /// Attach the run's error id and every distinct id seen on actions.
    pub(crate) fn errors(mut self, error_id: Option<&str>, outcomes: &[ActionOutcome]) -> Self {
        let mut chain: Vec<&str> = Vec::new();
        for id in outcomes.iter().filter_map(|o| o.error_id.as_deref()) {
            if !chain.contains(&id) {
                chain.push(id);
            }
        }
        if let Some(obj) = self.fields.as_object_mut() {
            if let Some(id) = error_id {
                obj.insert("error_id".to_string(), json!(id));
                obj.insert(
                    "exit_code".to_string(),
                    json!(exit_code_for_id_str(id).unwrap_or(1)),
                );
            }
            if !chain.is_empty() {
                obj.insert("summary_error_ids".to_string(), json!(chain));
            }
        }
        self
    }

    pub(crate) fn emit(self, slog: &StageLogger<'_>, ok: bool) {
        if ok {
            slog.run_result().merge(&self.fields).emit_success();
        } else {
            slog.run_result().merge(&self.fields).emit_failure();
        }
    }
}

