use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::constants::LOCK_POLL_MS;
use crate::types::errors::{Error, ErrorKind, Result};
use fs2::FileExt;

use super::{LockGuard, LockManager};

/// Advisory `flock`-style lock on a file, one per campaign directory or shared across them.
#[derive(Debug)]
pub struct FileLockManager {
    path: PathBuf,
}

impl FileLockManager {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Lock file living next to a campaign's journal.
    #[must_use]
    pub fn for_campaign(root: &Path, campaign: &str) -> Self {
        Self::new(root.join(format!("{campaign}.lock")))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

struct FileGuard {
    file: File,
}

impl Drop for FileGuard {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl LockGuard for FileGuard {}

impl LockManager for FileLockManager {
    fn acquire_process_lock(&self, timeout_ms: u64) -> Result<Box<dyn LockGuard>> {
        let t0 = Instant::now();
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error {
                kind: ErrorKind::Io,
                msg: e.to_string(),
            })?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| Error {
                kind: ErrorKind::Io,
                msg: e.to_string(),
            })?;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    // holder pid, for operators inspecting a stuck lock
                    let _ = file.set_len(0);
                    let _ = writeln!(file, "{}", std::process::id());
                    return Ok(Box::new(FileGuard { file }));
                }
                Err(_e) => {
                    if t0.elapsed() >= Duration::from_millis(timeout_ms) {
                        return Err(Error {
                            kind: ErrorKind::Policy,
                            msg: format!(
                                "E_LOCKING: timeout acquiring {} after {timeout_ms}ms",
                                self.path.display()
                            ),
                        });
                    }
                    thread::sleep(Duration::from_millis(LOCK_POLL_MS));
                }
            }
        }
    }
}
