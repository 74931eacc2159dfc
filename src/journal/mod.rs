//! Idempotent execution journal.
//!
//! The journal maps `(campaign, action id)` to an `ExecutionRecord`. It is a
//! passive store: only the run engine decides what to write. Once a record is
//! `Confirmed`, later writes for that id are ignored, which is what makes
//! re-running a plan safe.

pub mod file;
pub mod memory;

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::action::ActionId;
use crate::types::record::ExecutionRecord;

pub use file::FileJournal;
pub use memory::MemoryJournal;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal io at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt journal entry at {path}: {msg}")]
    Corrupt { path: PathBuf, msg: String },
    #[error("journal lock poisoned")]
    Poisoned,
}

/// Result of a `put`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PutOutcome {
    Written,
    /// The stored record was already `Confirmed`; nothing changed.
    IgnoredConfirmed,
}

pub trait Journal: Send + Sync {
    /// Campaign this journal belongs to.
    fn campaign(&self) -> &str;

    fn get(&self, id: &ActionId) -> Result<Option<ExecutionRecord>, JournalError>;

    /// Atomically replace the record for `id`, unless it is already confirmed.
    fn put(&self, id: &ActionId, record: ExecutionRecord) -> Result<PutOutcome, JournalError>;

    /// Every stored record.
    fn records(&self) -> Result<BTreeMap<ActionId, ExecutionRecord>, JournalError>;

    /// Remember the fingerprint of the plan writing to this journal. Returns the
    /// previously bound fingerprint when it differs.
    fn bind_plan(&self, _plan_id: &str) -> Result<Option<String>, JournalError> {
        Ok(None)
    }
}

/// Shared guard for both implementations: a confirmed record is final.
pub(crate) fn accepts(existing: Option<&ExecutionRecord>) -> bool {
    !existing.is_some_and(ExecutionRecord::is_confirmed)
}
