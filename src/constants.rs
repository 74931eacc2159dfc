//! Shared crate-wide constants for Tokenrail.
//!
//! Centralizes defaults and well-known method names used across modules.
//! Adjusting these here will propagate through the crate.

/// UUIDv5 namespace tag for deterministic plan IDs.
pub const NS_TAG: &str = "https://tokenrail/plan";

/// Signer label used for state-changing actions that do not name one.
pub const DEFAULT_SIGNER: &str = "deployer";

/// Token decimals assumed by the campaign loader when the document omits them.
pub const DEFAULT_DECIMALS: u32 = 18;

/// Bounded number of dispatch tries per action within a single run.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// First backoff delay after a transient failure; doubled per retry.
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 500;

/// Ceiling for the exponential backoff delay.
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 8_000;

/// Bounded wait for a submission to be confirmed before it counts as transient.
pub const DEFAULT_CONFIRM_TIMEOUT_MS: u64 = 120_000;

/// Upper bound of concurrently dispatched actions in `Concurrency::PerSigner`.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Poll interval in milliseconds for the file-backed lock manager.
pub const LOCK_POLL_MS: u64 = 25;

/// Default lock timeout used by `Orchestrator::new()` unless overridden.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;

/// Temporary filename suffix used for atomic journal writes.
pub const TMP_SUFFIX: &str = ".tokenrail.tmp";

/// File inside a campaign journal directory that binds it to a plan fingerprint.
pub const JOURNAL_MANIFEST: &str = "manifest.json";

/// Subdirectory holding one record file per action.
pub const JOURNAL_ACTIONS_DIR: &str = "actions";

/// Schema tag written into the journal manifest.
pub const JOURNAL_SCHEMA: &str = "tokenrail.journal.v1";

pub const METHOD_TRANSFER: &str = "transfer";
pub const METHOD_BALANCE_OF: &str = "balanceOf";
pub const METHOD_ADD_TO_WHITELIST: &str = "addToWhitelist";
pub const METHOD_CREATE_VESTING: &str = "createVestingSchedule";
