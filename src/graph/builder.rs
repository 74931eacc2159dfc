use std::collections::BTreeSet;

use crate::types::action::{Action, ActionId, ActionKind, Target};
use crate::types::campaign::AllocationSpec;
use crate::types::errors::ConstructionError;
use crate::types::plan::{BalanceCheck, Plan};
use crate::types::value::Amount;

use super::topology;

/// Accumulates actions and validates them into a `Plan`.
///
/// Validation happens once, in `finish`, so callers can push actions in any
/// order and reference ids declared later.
#[derive(Debug, Default)]
pub struct PlanBuilder {
    name: String,
    actions: Vec<Action>,
    allocations: Vec<AllocationSpec>,
    expected_total: Option<Amount>,
    balance_checks: Vec<BalanceCheck>,
}

impl PlanBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Append an action; returns its id for wiring later edges.
    pub fn push(&mut self, action: Action) -> ActionId {
        let id = action.id.clone();
        self.actions.push(action);
        id
    }

    #[must_use]
    pub fn contains(&self, id: &ActionId) -> bool {
        self.actions.iter().any(|a| &a.id == id)
    }

    pub fn get_mut(&mut self, id: &ActionId) -> Option<&mut Action> {
        self.actions.iter_mut().find(|a| &a.id == id)
    }

    pub fn allocations(&mut self, allocations: Vec<AllocationSpec>) -> &mut Self {
        self.allocations = allocations;
        self
    }

    pub fn expected_total(&mut self, total: Option<Amount>) -> &mut Self {
        self.expected_total = total;
        self
    }

    pub fn balance_check(&mut self, check: BalanceCheck) -> &mut Self {
        self.balance_checks.push(check);
        self
    }

    /// Validate and freeze. On error no plan is produced.
    ///
    /// Checks, in order: unique ids, well-formed targets, implicit future edges
    /// folded into `depends_on`, every dependency names a known action, no cycles.
    pub fn finish(self) -> Result<Plan, ConstructionError> {
        let PlanBuilder {
            name,
            mut actions,
            allocations,
            expected_total,
            balance_checks,
        } = self;

        let mut seen: BTreeSet<&ActionId> = BTreeSet::new();
        for a in &actions {
            if !seen.insert(&a.id) {
                return Err(ConstructionError::DuplicateId(a.id.clone()));
            }
        }

        for a in &actions {
            let ok = matches!(
                (a.kind, &a.target),
                (ActionKind::Deploy, Target::Deploy { .. })
                    | (ActionKind::Call | ActionKind::StaticCall, Target::Invoke { .. })
            );
            if !ok {
                return Err(ConstructionError::MalformedAction {
                    action: a.id.clone(),
                    reason: format!("{} action with mismatched target", a.kind.as_str()),
                });
            }
            // A failed expectation must never turn a confirmed transaction retryable.
            if a.expect.is_some() && a.kind != ActionKind::StaticCall {
                return Err(ConstructionError::MalformedAction {
                    action: a.id.clone(),
                    reason: format!("{} action cannot carry an expectation", a.kind.as_str()),
                });
            }
        }

        for a in &mut actions {
            let implicit = a.implicit_dependencies();
            a.depends_on.extend(implicit);
        }

        let ids: BTreeSet<ActionId> = actions.iter().map(|a| a.id.clone()).collect();
        for a in &actions {
            if let Some(missing) = a.depends_on.iter().find(|d| !ids.contains(*d)) {
                return Err(ConstructionError::UnknownDependency {
                    action: a.id.clone(),
                    missing: missing.clone(),
                });
            }
        }

        topology::order(&actions).map_err(|e| ConstructionError::Cycle {
            involved: e.involved_nodes,
        })?;

        for c in &balance_checks {
            if !ids.contains(&c.action) {
                return Err(ConstructionError::UnknownDependency {
                    action: c.action.clone(),
                    missing: c.action.clone(),
                });
            }
        }

        Ok(Plan::from_parts(
            name,
            actions,
            allocations,
            expected_total,
            balance_checks,
        ))
    }
}
