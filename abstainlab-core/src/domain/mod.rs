//! Domain types for AbstainLab

pub mod category;
pub mod ids;
pub mod run;

pub use category::{CategoryKind, CategoryKinds};
pub use ids::{CategoryId, ConfigName};
pub use run::{RunResult, RunSet, RunSetError};
