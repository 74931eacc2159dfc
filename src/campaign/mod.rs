//! Allocation and vesting campaigns: YAML loading and plan derivation.

pub mod builder;
pub mod yaml;

pub use builder::build;
pub use yaml::{load_path, load_str, LoadError};
