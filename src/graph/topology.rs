//! Topological ordering, cycle detection, and signer-aware wave scheduling.

use std::collections::{BTreeMap, BTreeSet};

use crate::constants::DEFAULT_SIGNER;
use crate::types::action::{Action, ActionId};
use crate::types::plan::Plan;

/// Error returned when a dependency cycle is detected.
///
/// Contains every action that could not be scheduled: the members of the
/// cycle plus anything downstream of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError {
    pub involved_nodes: Vec<ActionId>,
}

/// Kahn's algorithm over builder indices. Among ready actions the lowest builder
/// index goes first, so the order is a pure function of the action list.
///
/// Every id in `depends_on` must name an action in `actions`; unknown ids are ignored.
pub(crate) fn order(actions: &[Action]) -> Result<Vec<usize>, CycleError> {
    let index: BTreeMap<&ActionId, usize> =
        actions.iter().enumerate().map(|(i, a)| (&a.id, i)).collect();

    let mut in_degree = vec![0usize; actions.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); actions.len()];
    for (i, a) in actions.iter().enumerate() {
        for d in &a.depends_on {
            if let Some(&j) = index.get(d) {
                in_degree[i] += 1;
                dependents[j].push(i);
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..actions.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut out = Vec::with_capacity(actions.len());
    while let Some(i) = ready.pop_first() {
        out.push(i);
        for &j in &dependents[i] {
            in_degree[j] -= 1;
            if in_degree[j] == 0 {
                ready.insert(j);
            }
        }
    }

    if out.len() != actions.len() {
        let involved_nodes = actions
            .iter()
            .enumerate()
            .filter(|(i, _)| in_degree[*i] > 0)
            .map(|(_, a)| a.id.clone())
            .collect();
        return Err(CycleError { involved_nodes });
    }
    Ok(out)
}

/// Deterministic serial schedule for a validated plan: topological, ties broken by builder order.
#[must_use]
pub fn schedule(plan: &Plan) -> Vec<usize> {
    // Plans are validated acyclic at construction.
    order(plan.actions()).unwrap_or_else(|_| (0..plan.len()).collect())
}

/// Signer lane of a transaction; reads have none.
pub(crate) fn lane(a: &Action) -> Option<&str> {
    if a.kind.is_transaction() {
        Some(a.signer.as_deref().unwrap_or(DEFAULT_SIGNER))
    } else {
        None
    }
}

/// Group the schedule into waves: every action's dependencies sit in strictly
/// earlier waves. With `serialize_signers`, consecutive transactions of one signer
/// (in schedule order) are chained too, so a wave never holds two transactions
/// from the same signer.
#[must_use]
pub fn waves(plan: &Plan, serialize_signers: bool) -> Vec<Vec<usize>> {
    let sched = schedule(plan);
    let actions = plan.actions();
    let index: BTreeMap<&ActionId, usize> =
        actions.iter().enumerate().map(|(i, a)| (&a.id, i)).collect();

    let mut level = vec![0usize; actions.len()];
    let mut last_in_lane: BTreeMap<&str, usize> = BTreeMap::new();
    for &i in &sched {
        let a = &actions[i];
        let mut lv = a
            .depends_on
            .iter()
            .filter_map(|d| index.get(d))
            .map(|&j| level[j] + 1)
            .max()
            .unwrap_or(0);
        if serialize_signers {
            if let Some(l) = lane(a) {
                if let Some(&prev) = last_in_lane.get(l) {
                    lv = lv.max(level[prev] + 1);
                }
                last_in_lane.insert(l, i);
            }
        }
        level[i] = lv;
    }

    let depth = level.iter().copied().max().map_or(0, |m| m + 1);
    let mut out: Vec<Vec<usize>> = vec![Vec::new(); depth];
    for &i in &sched {
        out[level[i]].push(i);
    }
    for w in &mut out {
        w.sort_unstable();
    }
    out
}
