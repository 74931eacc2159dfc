//! Atomic file replacement and durability helpers.
//!
//! Writes go to a uniquely named temporary sibling, are fsynced, then renamed
//! over the destination, and finally the parent directory is fsynced. Readers
//! observe either the previous content or the new content, never a torn file.
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::constants::TMP_SUFFIX;

// Global counter to produce unique temporary names within a process.
static NEXT_TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Fsync the parent directory of `path` for durability.
///
/// # Errors
///
/// Returns an IO error if the parent directory cannot be opened or fsynced.
pub fn fsync_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        let dir = fs::File::open(parent)?;
        dir.sync_all()?;
    }
    Ok(())
}

fn tmp_path_for(target: &Path) -> PathBuf {
    let n = NEXT_TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let fname = target
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("file");
    let tmp = format!(".{fname}.{}.{n}{TMP_SUFFIX}", std::process::id());
    target.with_file_name(tmp)
}

/// Atomically replace `target` with `bytes`.
///
/// # Errors
///
/// Returns an IO error if writing, syncing, or renaming fails. The temporary
/// file is removed on failure.
pub fn write_atomic(target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = tmp_path_for(target);
    let res = (|| {
        let mut f = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
        fs::rename(&tmp, target)?;
        fsync_parent_dir(target)
    })();
    if res.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    res
}

/// True for leftovers of an interrupted `write_atomic`.
#[must_use]
pub fn is_tmp_artifact(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.ends_with(TMP_SUFFIX))
}
