use crate::adapters::LedgerError;
use crate::resolve::ResolveError;

use super::ErrorId;

/// Map a final ledger failure to a stable `ErrorId`. Transient failures only reach
/// here once the retry budget is spent.
#[must_use]
pub const fn map_ledger_error(e: &LedgerError) -> ErrorId {
    match e {
        LedgerError::Rejected(_) => ErrorId::E_REJECTED,
        LedgerError::Transient(_) | LedgerError::Timeout(_) => ErrorId::E_TRANSIENT,
    }
}

/// Journal read failures during resolution are storage errors; everything else
/// is a scheduling bug.
#[must_use]
pub const fn map_resolve_error(e: &ResolveError) -> ErrorId {
    match e {
        ResolveError::Journal(_) => ErrorId::E_JOURNAL,
        ResolveError::UnresolvedDependency { .. }
        | ResolveError::OutputOutOfRange { .. }
        | ResolveError::NotAnAddress { .. } => ErrorId::E_UNRESOLVED,
    }
}
