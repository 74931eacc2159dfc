//! Durable journal: one JSON file per action, written atomically.
//!
//! Layout under `root`:
//! ```text
//! <campaign>/manifest.json          schema tag, campaign name, bound plan id
//! <campaign>/actions/<action>.json  { "id": ..., "record": ExecutionRecord }
//! ```
//! Ids outside `[A-Za-z0-9_.-]` are stored under a hex-encoded file name.
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::{accepts, Journal, JournalError, PutOutcome};
use crate::constants::{JOURNAL_ACTIONS_DIR, JOURNAL_MANIFEST, JOURNAL_SCHEMA};
use crate::fs::{is_tmp_artifact, write_atomic};
use crate::types::action::ActionId;
use crate::types::record::ExecutionRecord;

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    schema: String,
    campaign: String,
    #[serde(default)]
    plan_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    id: ActionId,
    record: ExecutionRecord,
}

#[derive(Debug)]
pub struct FileJournal {
    campaign: String,
    dir: PathBuf,
    // serializes read-check-write within this process; the run lock covers other processes
    write: Mutex<()>,
}

fn io(path: &Path) -> impl FnOnce(std::io::Error) -> JournalError + '_ {
    move |source| JournalError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn file_stem(name: &str) -> String {
    // `x-` is reserved for escaped names, so a plain name never aliases one.
    let plain = !name.is_empty()
        && !name.starts_with('.')
        && !name.starts_with("x-")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if plain {
        name.to_string()
    } else {
        format!("x-{}", hex::encode(name.as_bytes()))
    }
}

impl FileJournal {
    /// Open (creating if needed) the journal for `campaign` under `root`.
    ///
    /// # Errors
    ///
    /// Fails when the directory cannot be created or an existing manifest names
    /// another campaign or an unknown schema.
    pub fn open(root: &Path, campaign: &str) -> Result<Self, JournalError> {
        let dir = root.join(file_stem(campaign));
        let actions = dir.join(JOURNAL_ACTIONS_DIR);
        fs::create_dir_all(&actions).map_err(io(&actions))?;
        let j = Self {
            campaign: campaign.to_string(),
            dir,
            write: Mutex::new(()),
        };
        match j.read_manifest()? {
            Some(m) if m.schema != JOURNAL_SCHEMA || m.campaign != campaign => {
                return Err(JournalError::Corrupt {
                    path: j.manifest_path(),
                    msg: format!(
                        "manifest is for campaign `{}` with schema `{}`",
                        m.campaign, m.schema
                    ),
                });
            }
            Some(_) => {}
            None => j.write_manifest(&Manifest {
                schema: JOURNAL_SCHEMA.to_string(),
                campaign: campaign.to_string(),
                plan_id: None,
            })?,
        }
        Ok(j)
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn manifest_path(&self) -> PathBuf {
        self.dir.join(JOURNAL_MANIFEST)
    }

    fn record_path(&self, id: &ActionId) -> PathBuf {
        self.dir
            .join(JOURNAL_ACTIONS_DIR)
            .join(format!("{}.json", file_stem(id.as_str())))
    }

    fn read_manifest(&self) -> Result<Option<Manifest>, JournalError> {
        let p = self.manifest_path();
        match fs::read(&p) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| JournalError::Corrupt {
                    path: p.clone(),
                    msg: e.to_string(),
                }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io(&p)(e)),
        }
    }

    fn write_manifest(&self, m: &Manifest) -> Result<(), JournalError> {
        let p = self.manifest_path();
        let bytes = serde_json::to_vec_pretty(m).map_err(|e| JournalError::Corrupt {
            path: p.clone(),
            msg: e.to_string(),
        })?;
        write_atomic(&p, &bytes).map_err(io(&p))
    }

    fn read_record(path: &Path) -> Result<StoredRecord, JournalError> {
        let bytes = fs::read(path).map_err(io(path))?;
        serde_json::from_slice(&bytes).map_err(|e| JournalError::Corrupt {
            path: path.to_path_buf(),
            msg: e.to_string(),
        })
    }
}

impl Journal for FileJournal {
    fn campaign(&self) -> &str {
        &self.campaign
    }

    fn get(&self, id: &ActionId) -> Result<Option<ExecutionRecord>, JournalError> {
        let p = self.record_path(id);
        if !p.exists() {
            return Ok(None);
        }
        let stored = Self::read_record(&p)?;
        if &stored.id != id {
            return Err(JournalError::Corrupt {
                path: p,
                msg: format!("holds record for `{}`", stored.id),
            });
        }
        Ok(Some(stored.record))
    }

    fn put(&self, id: &ActionId, record: ExecutionRecord) -> Result<PutOutcome, JournalError> {
        let _w = self.write.lock().map_err(|_| JournalError::Poisoned)?;
        if !accepts(self.get(id)?.as_ref()) {
            return Ok(PutOutcome::IgnoredConfirmed);
        }
        let p = self.record_path(id);
        let stored = StoredRecord {
            id: id.clone(),
            record,
        };
        let bytes = serde_json::to_vec_pretty(&stored).map_err(|e| JournalError::Corrupt {
            path: p.clone(),
            msg: e.to_string(),
        })?;
        write_atomic(&p, &bytes).map_err(io(&p))?;
        Ok(PutOutcome::Written)
    }

    fn records(&self) -> Result<BTreeMap<ActionId, ExecutionRecord>, JournalError> {
        let dir = self.dir.join(JOURNAL_ACTIONS_DIR);
        let mut out = BTreeMap::new();
        for entry in fs::read_dir(&dir).map_err(io(&dir))? {
            let entry = entry.map_err(io(&dir))?;
            let p = entry.path();
            if is_tmp_artifact(&p) || p.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let stored = Self::read_record(&p)?;
            out.insert(stored.id, stored.record);
        }
        Ok(out)
    }

    fn bind_plan(&self, plan_id: &str) -> Result<Option<String>, JournalError> {
        let _w = self.write.lock().map_err(|_| JournalError::Poisoned)?;
        let mut m = self.read_manifest()?.unwrap_or(Manifest {
            schema: JOURNAL_SCHEMA.to_string(),
            campaign: self.campaign.clone(),
            plan_id: None,
        });
        let prev = m.plan_id.replace(plan_id.to_string());
        if prev.as_deref() != Some(plan_id) {
            self.write_manifest(&m)?;
        }
        Ok(prev.filter(|p| p != plan_id))
    }
}
