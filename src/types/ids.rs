//! Deterministic UUIDv5 plan fingerprints and per-run identifiers.
//!
//! The UUID namespace is derived from a stable tag (`NS_TAG`) so that
//! `plan_id` is reproducible across runs for the same action graph. A journal
//! remembers the `plan_id` it was written under, which lets a resumed run notice
//! that the campaign definition changed in between.
use std::fmt::Write;
use uuid::Uuid;

use super::action::{Action, Target};
use super::plan::Plan;
use crate::constants::NS_TAG;

fn namespace() -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, NS_TAG.as_bytes())
}

/// Serialize an action into a stable, human-readable string used for UUIDv5 input.
fn serialize_action(a: &Action) -> String {
    let mut s = format!("{}:{}:", a.kind.as_str(), a.id);
    match &a.target {
        Target::Deploy { contract } => s.push_str(contract),
        Target::Invoke { instance, method } => {
            let _ = write!(s, "{instance}.{method}");
        }
    }
    s.push('(');
    for (i, arg) in a.args.iter().enumerate() {
        if i > 0 {
            s.push(',');
        }
        let _ = write!(s, "{arg}");
    }
    s.push(')');
    for d in &a.depends_on {
        let _ = write!(s, "<{d}");
    }
    if let Some(signer) = &a.signer {
        let _ = write!(s, "@{signer}");
    }
    s
}

/// Compute a deterministic UUIDv5 for a plan by serializing actions in order.
///
/// Two plans with identical actions, edges, and ordering have the same `plan_id`.
#[must_use]
pub fn plan_id(plan: &Plan) -> Uuid {
    let ns = namespace();
    let mut s = format!("{}\n", plan.name());
    for a in plan.actions() {
        s.push_str(&serialize_action(a));
        s.push('\n');
    }
    Uuid::new_v5(&ns, s.as_bytes())
}

/// Fresh identifier for one execution attempt of a plan.
#[must_use]
pub fn new_run_id() -> String {
    Uuid::new_v4().to_string()
}
