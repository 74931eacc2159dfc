use log::Level;
use serde_json::json;
use uuid::Uuid;

use crate::api::errors::{ApiError, ErrorId};
use crate::api::Orchestrator;
use crate::campaign;
use crate::logging::audit::{AuditCtx, AuditMode};
use crate::logging::{now_iso, AuditSink, FactsEmitter, StageLogger};
use crate::types::ids::{new_run_id, plan_id};
use crate::types::{ActionKind, CampaignSpec, Plan};

pub(crate) fn build<E: FactsEmitter, A: AuditSink>(
    api: &Orchestrator<E, A>,
    spec: &CampaignSpec,
) -> Result<Plan, ApiError> {
    let result = campaign::build(spec);
    let pid = result.as_ref().map_or(Uuid::nil(), plan_id);
    let tctx = AuditCtx::new(
        &api.facts as &dyn FactsEmitter,
        spec.name.clone(),
        pid.to_string(),
        new_run_id(),
        now_iso(),
        AuditMode::default(),
    );
    let slog = StageLogger::new(&tctx);

    match result {
        Ok(plan) => {
            let count = |k: ActionKind| plan.actions().iter().filter(|a| a.kind == k).count();
            slog.plan()
                .merge(&json!({
                    "actions": plan.len(),
                    "deploys": count(ActionKind::Deploy),
                    "calls": count(ActionKind::Call),
                    "reads": count(ActionKind::StaticCall),
                    "edges": plan.edges().len(),
                    "allocations": plan.allocations().len(),
                }))
                .emit_success();
            api.audit.log(
                Level::Info,
                &format!("plan: {} actions for campaign {}", plan.len(), plan.name()),
            );
            Ok(plan)
        }
        Err(e) => {
            slog.plan()
                .field("error", json!(e.to_string()))
                .error_id(ErrorId::E_CONSTRUCTION)
                .emit_failure();
            api.audit.log(Level::Error, &format!("plan: {e}"));
            Err(ApiError::Construction(e))
        }
    }
}
