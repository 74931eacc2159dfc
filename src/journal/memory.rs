use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{accepts, Journal, JournalError, PutOutcome};
use crate::types::action::ActionId;
use crate::types::record::ExecutionRecord;

/// In-process journal. Survives as long as the value does; use `FileJournal`
/// when the campaign must survive a restart.
#[derive(Debug, Default)]
pub struct MemoryJournal {
    campaign: String,
    records: Mutex<BTreeMap<ActionId, ExecutionRecord>>,
    plan_id: Mutex<Option<String>>,
}

impl MemoryJournal {
    pub fn new(campaign: impl Into<String>) -> Self {
        Self {
            campaign: campaign.into(),
            ..Self::default()
        }
    }

    /// Seed with existing records, e.g. to model the state left by a crashed run.
    pub fn with_records(
        campaign: impl Into<String>,
        records: impl IntoIterator<Item = (ActionId, ExecutionRecord)>,
    ) -> Self {
        let j = Self::new(campaign);
        if let Ok(mut m) = j.records.lock() {
            m.extend(records);
        }
        j
    }

    /// Copy of the current contents.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<ActionId, ExecutionRecord> {
        self.records().unwrap_or_default()
    }

    fn map(&self) -> Result<MutexGuard<'_, BTreeMap<ActionId, ExecutionRecord>>, JournalError> {
        self.records.lock().map_err(|_| JournalError::Poisoned)
    }
}

impl Journal for MemoryJournal {
    fn campaign(&self) -> &str {
        &self.campaign
    }

    fn get(&self, id: &ActionId) -> Result<Option<ExecutionRecord>, JournalError> {
        Ok(self.map()?.get(id).cloned())
    }

    fn put(&self, id: &ActionId, record: ExecutionRecord) -> Result<PutOutcome, JournalError> {
        let mut m = self.map()?;
        if !accepts(m.get(id)) {
            return Ok(PutOutcome::IgnoredConfirmed);
        }
        m.insert(id.clone(), record);
        Ok(PutOutcome::Written)
    }

    fn records(&self) -> Result<BTreeMap<ActionId, ExecutionRecord>, JournalError> {
        Ok(self.map()?.clone())
    }

    fn bind_plan(&self, plan_id: &str) -> Result<Option<String>, JournalError> {
        let mut slot = self.plan_id.lock().map_err(|_| JournalError::Poisoned)?;
        let prev = slot.replace(plan_id.to_string());
        Ok(prev.filter(|p| p != plan_id))
    }
}
