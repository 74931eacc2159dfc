#![forbid(unsafe_code)]
//! Tokenrail: idempotent action-graph orchestration for token distribution campaigns.
//!
//! Execution model highlights:
//! - A campaign (deployments, whitelist targets, allocations with optional vesting) is compiled
//!   into an immutable, acyclic `Plan` of deploy / call / read actions with explicit edges.
//! - Arguments that depend on earlier results are `FutureRef`s, resolved from confirmed
//!   journal records only at dispatch time.
//! - Every state transition is written to a `Journal` first, so a crashed run resumes
//!   without ever re-submitting a confirmed action.
//! - The allocation total is checked against the expected supply before any ledger call,
//!   and again against recorded balances after the run.

pub mod constants;
pub mod adapters;
pub mod api;
pub mod campaign;
pub mod fs;
pub mod graph;
pub mod journal;
pub mod logging;
pub mod policy;
pub mod resolve;
pub mod types;

pub use api::*;
