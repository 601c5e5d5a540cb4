pub mod phases;
pub mod summary;

pub use phases::{Phase, RestorationPlan};
pub use summary::{SchemaAnalysis, TableSummary};
