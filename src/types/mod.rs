pub mod action;
pub mod campaign;
pub mod errors;
pub mod ids;
pub mod plan;
pub mod record;
pub mod report;
pub mod value;

pub use action::*;
pub use campaign::*;
pub use errors::*;
pub use ids::*;
pub use plan::*;
pub use record::*;
pub use report::*;
pub use value::*;
