//! Policy configuration for runs.
//!
//! The `policy` module centralizes the retry, timeout, scheduling, verification,
//! and locking knobs used by the run stage. Consumers typically construct a
//! [`Policy`](crate::policy::Policy) via `Policy::default()` or
//! `Policy::production_preset()` and then customize fields before creating an
//! [`Orchestrator`](crate::Orchestrator) instance.
//!
//! Submodules:
//! - `config`: policy struct, presets, YAML loading
//! - `types`: grouped knob structs and enums

pub mod config;
pub mod types;

pub use config::Policy;
pub use types::{Concurrency, FailurePolicy, InDoubtPolicy, LockingPolicy};
