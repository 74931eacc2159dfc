//! Generic action-graph construction and scheduling.
//!
//! `PlanBuilder` validates a set of actions into an immutable `Plan`;
//! `topology` derives the deterministic execution order and concurrent waves.

pub mod builder;
pub mod topology;

pub use builder::PlanBuilder;
pub use topology::{schedule, waves, CycleError};
