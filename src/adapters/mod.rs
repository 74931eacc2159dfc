pub mod ledger;
pub mod lock;
pub mod sim;

pub use ledger::{Ledger, LedgerError, Receipt};
pub use lock::{FileLockManager, LockGuard, LockManager};
pub use sim::{signer_address, FaultKind, SimKind, SimLedger};
