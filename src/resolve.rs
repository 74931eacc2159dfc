//! Future resolution: a stateless projection of confirmed journal records.
//!
//! Resolving a reference whose producer is not `Confirmed` means the engine
//! dispatched an action before its dependencies, which is a scheduling bug and
//! is reported as `UnresolvedDependency`, never retried.
use thiserror::Error;

use crate::journal::{Journal, JournalError};
use crate::types::action::{Action, ActionId, Arg, FutureRef, Target};
use crate::types::record::Status;
use crate::types::value::{Address, Value};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("`{action}` is not confirmed (status: {status})")]
    UnresolvedDependency { action: ActionId, status: String },
    #[error("`{action}` produced {len} values; output {index} requested")]
    OutputOutOfRange {
        action: ActionId,
        index: usize,
        len: usize,
    },
    #[error("`{action}` did not produce an address (got {got})")]
    NotAnAddress { action: ActionId, got: String },
    #[error(transparent)]
    Journal(#[from] JournalError),
}

/// Concrete value of a future. `Deployed(x)` is output 0 of `x` and must be an address.
pub fn resolve(r: &FutureRef, journal: &dyn Journal) -> Result<Value, ResolveError> {
    let (producer, index) = match r {
        FutureRef::Deployed(a) => (a, 0),
        FutureRef::Output { action, index } => (action, *index),
    };
    let rec = journal.get(producer)?;
    let values = match &rec {
        Some(r) if r.status() == Status::Confirmed => r.result().unwrap_or(&[]),
        other => {
            return Err(ResolveError::UnresolvedDependency {
                action: producer.clone(),
                status: other
                    .as_ref()
                    .map_or_else(|| "absent".to_string(), |r| r.status().to_string()),
            })
        }
    };
    let v = values
        .get(index)
        .cloned()
        .ok_or_else(|| ResolveError::OutputOutOfRange {
            action: producer.clone(),
            index,
            len: values.len(),
        })?;
    if matches!(r, FutureRef::Deployed(_)) && v.as_address().is_none() {
        return Err(ResolveError::NotAnAddress {
            action: producer.clone(),
            got: v.type_name().to_string(),
        });
    }
    Ok(v)
}

pub fn resolve_arg(arg: &Arg, journal: &dyn Journal) -> Result<Value, ResolveError> {
    match arg {
        Arg::Literal(v) => Ok(v.clone()),
        Arg::Future(f) => resolve(f, journal),
    }
}

/// An action with every future replaced by its value, ready for the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolved {
    Deploy {
        contract: String,
        args: Vec<Value>,
    },
    Invoke {
        instance: Address,
        method: String,
        args: Vec<Value>,
    },
}

pub fn resolve_action(action: &Action, journal: &dyn Journal) -> Result<Resolved, ResolveError> {
    let args = action
        .args
        .iter()
        .map(|a| resolve_arg(a, journal))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(match &action.target {
        Target::Deploy { contract } => Resolved::Deploy {
            contract: contract.clone(),
            args,
        },
        Target::Invoke { instance, method } => {
            let v = resolve_arg(instance, journal)?;
            let instance = v.as_address().ok_or_else(|| ResolveError::NotAnAddress {
                action: action.id.clone(),
                got: v.type_name().to_string(),
            })?;
            Resolved::Invoke {
                instance,
                method: method.clone(),
                args,
            }
        }
    })
}
