pub mod file;

use crate::types::errors::Result;

pub use file::FileLockManager;

/// Held for the duration of a commit run; releasing happens on drop.
pub trait LockGuard: Send {}

/// Serializes commit runs that share signers, so two processes never race for the same nonces.
pub trait LockManager: Send + Sync {
    /// Acquire the process lock, waiting at most `timeout_ms`.
    /// # Errors
    /// Returns an error if the lock cannot be acquired within the timeout period.
    fn acquire_process_lock(&self, timeout_ms: u64) -> Result<Box<dyn LockGuard>>;
}
