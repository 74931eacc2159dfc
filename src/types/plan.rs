use serde::{Deserialize, Serialize};

use super::action::{Action, ActionId};
use super::campaign::AllocationSpec;
use super::value::Amount;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Walk the schedule and report; never touches the ledger or the journal.
    #[default]
    DryRun,
    Commit,
}

/// Expected balance of one recipient once every transfer to it is confirmed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceCheck {
    /// The read action whose confirmed result holds the observed balance.
    pub action: ActionId,
    pub recipient: String,
    pub expected: Amount,
    /// Allocations routed to this recipient.
    pub allocations: Vec<String>,
}

/// A complete, validated, acyclic action graph. Immutable once built; obtain one
/// from `graph::PlanBuilder::finish` or `campaign::build`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    name: String,
    actions: Vec<Action>,
    allocations: Vec<AllocationSpec>,
    expected_total: Option<Amount>,
    balance_checks: Vec<BalanceCheck>,
}

impl Plan {
    pub(crate) fn from_parts(
        name: String,
        actions: Vec<Action>,
        allocations: Vec<AllocationSpec>,
        expected_total: Option<Amount>,
        balance_checks: Vec<BalanceCheck>,
    ) -> Self {
        Self {
            name,
            actions,
            allocations,
            expected_total,
            balance_checks,
        }
    }

    /// Campaign name; the journal is keyed by it.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Actions in builder order. Dependencies always include implicit future edges.
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    #[must_use]
    pub fn allocations(&self) -> &[AllocationSpec] {
        &self.allocations
    }

    #[must_use]
    pub const fn expected_total(&self) -> Option<Amount> {
        self.expected_total
    }

    #[must_use]
    pub fn balance_checks(&self) -> &[BalanceCheck] {
        &self.balance_checks
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    #[must_use]
    pub fn position(&self, id: &ActionId) -> Option<usize> {
        self.actions.iter().position(|a| &a.id == id)
    }

    #[must_use]
    pub fn action(&self, id: &ActionId) -> Option<&Action> {
        self.actions.iter().find(|a| &a.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ActionId> {
        self.actions.iter().map(|a| &a.id)
    }

    /// All `(dependency, dependent)` edges, sorted.
    #[must_use]
    pub fn edges(&self) -> Vec<(ActionId, ActionId)> {
        let mut out: Vec<(ActionId, ActionId)> = self
            .actions
            .iter()
            .flat_map(|a| a.depends_on.iter().map(move |d| (d.clone(), a.id.clone())))
            .collect();
        out.sort();
        out
    }

    /// Actions calling `method`, in builder order.
    pub fn calls_to<'a>(&'a self, method: &'a str) -> impl Iterator<Item = &'a Action> + 'a {
        self.actions
            .iter()
            .filter(move |a| a.method() == Some(method))
    }
}
