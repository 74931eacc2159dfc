// Audit helpers that emit facts across Tokenrail stages.
//
// Side-effects:
// - Emits JSON facts via `FactsEmitter` for the stages `plan`, `precheck`,
//   `run.attempt`, `action.attempt`, `action.result`, `run.result`, `verify.result`.
// - Ensures a minimal envelope is present on every fact: `schema_version`, `ts`,
//   `plan_id`, `run_id`, `campaign`, `dry_run`.
// - Applies redaction in dry-run to zero timestamps and drop volatile fields.
use crate::api::errors::{exit_code_for, id_str, ErrorId};
use crate::logging::{redact_event, FactsEmitter};
use serde_json::{json, Value};

pub(crate) const SCHEMA_VERSION: i64 = 1;
const SUBSYSTEM: &str = "tokenrail";

#[derive(Clone, Debug, Default)]
pub(crate) struct AuditMode {
    pub dry_run: bool,
    pub redact: bool,
}

pub(crate) struct AuditCtx<'a> {
    pub facts: &'a dyn FactsEmitter,
    pub campaign: String,
    pub plan_id: String,
    pub run_id: String,
    pub ts: String,
    pub mode: AuditMode,
}

impl<'a> AuditCtx<'a> {
    pub(crate) fn new(
        facts: &'a dyn FactsEmitter,
        campaign: String,
        plan_id: String,
        run_id: String,
        ts: String,
        mode: AuditMode,
    ) -> Self {
        Self {
            facts,
            campaign,
            plan_id,
            run_id,
            ts,
            mode,
        }
    }
}

/// Stage for typed audit emission.
#[derive(Clone, Copy, Debug)]
pub enum Stage {
    Plan,
    Precheck,
    RunAttempt,
    ActionAttempt,
    ActionResult,
    RunResult,
    VerifyResult,
}

impl Stage {
    fn as_event(&self) -> &'static str {
        match self {
            Stage::Plan => "plan",
            Stage::Precheck => "precheck",
            Stage::RunAttempt => "run.attempt",
            Stage::ActionAttempt => "action.attempt",
            Stage::ActionResult => "action.result",
            Stage::RunResult => "run.result",
            Stage::VerifyResult => "verify.result",
        }
    }
}

/// Decision severity for audit events.
#[derive(Clone, Copy, Debug)]
pub enum Decision {
    Success,
    Failure,
    Warn,
}

impl Decision {
    fn as_str(&self) -> &'static str {
        match self {
            Decision::Success => "success",
            Decision::Failure => "failure",
            Decision::Warn => "warn",
        }
    }
}

/// Builder facade over audit emission with centralized envelope+redaction.
pub struct StageLogger<'a> {
    ctx: &'a AuditCtx<'a>,
}

impl<'a> StageLogger<'a> {
    pub(crate) fn new(ctx: &'a AuditCtx<'a>) -> Self {
        Self { ctx }
    }

    pub fn plan(&'a self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::Plan)
    }
    pub fn precheck(&'a self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::Precheck)
    }
    pub fn run_attempt(&'a self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::RunAttempt)
    }
    pub fn action_attempt(&'a self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::ActionAttempt)
    }
    pub fn action_result(&'a self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::ActionResult)
    }
    pub fn run_result(&'a self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::RunResult)
    }
    pub fn verify_result(&'a self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::VerifyResult)
    }
}

pub struct EventBuilder<'a> {
    ctx: &'a AuditCtx<'a>,
    stage: Stage,
    fields: serde_json::Map<String, Value>,
}

impl<'a> EventBuilder<'a> {
    fn new(ctx: &'a AuditCtx<'a>, stage: Stage) -> Self {
        let mut fields = serde_json::Map::new();
        fields.insert("stage".to_string(), json!(stage.as_event()));
        Self { ctx, stage, fields }
    }

    pub fn action(mut self, action_id: impl Into<String>) -> Self {
        self.fields.insert("action_id".into(), json!(action_id.into()));
        self
    }

    /// Attach a stable error id together with its exit code.
    pub fn error_id(mut self, id: ErrorId) -> Self {
        self.fields.insert("error_id".into(), json!(id_str(id)));
        self.fields
            .insert("exit_code".into(), json!(exit_code_for(id)));
        self
    }

    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn merge(mut self, extra: &Value) -> Self {
        if let Some(obj) = extra.as_object() {
            for (k, v) in obj {
                self.fields.insert(k.clone(), v.clone());
            }
        }
        self
    }

    pub fn emit(self, decision: Decision) {
        let mut fields = Value::Object(self.fields);
        if let Some(obj) = fields.as_object_mut() {
            obj.entry("decision").or_insert(json!(decision.as_str()));
        }
        redact_and_emit(self.ctx, self.stage.as_event(), decision.as_str(), fields);
    }

    pub fn emit_success(self) {
        self.emit(Decision::Success);
    }
    pub fn emit_failure(self) {
        self.emit(Decision::Failure);
    }
    pub fn emit_warn(self) {
        self.emit(Decision::Warn);
    }
}

fn redact_and_emit(ctx: &AuditCtx, event: &str, decision: &str, mut fields: Value) {
    if let Some(obj) = fields.as_object_mut() {
        obj.entry("schema_version").or_insert(json!(SCHEMA_VERSION));
        obj.entry("ts").or_insert(json!(ctx.ts));
        obj.entry("campaign").or_insert(json!(ctx.campaign));
        obj.entry("plan_id").or_insert(json!(ctx.plan_id));
        obj.entry("run_id").or_insert(json!(ctx.run_id));
        obj.entry("dry_run").or_insert(json!(ctx.mode.dry_run));
    }
    let out = if ctx.mode.redact {
        redact_event(fields)
    } else {
        fields
    };
    ctx.facts.emit(SUBSYSTEM, event, decision, out);
}
