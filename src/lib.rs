//! Scrape PostgreSQL dumps for named objects and rebuild them in phases.
//!
//! The pipeline is dump → extract → order → assemble → report. Everything
//! after the dump is a pure function of the dump text, so the library API
//! below works on strings; the `commands` module adds files, reports and
//! the external dump command.

pub mod analysis;
#[cfg(feature = "cli")]
pub mod cli;
pub mod commands;
pub mod config;
pub mod dump;
pub mod error;
pub mod logging;
pub mod output;
pub mod report;
pub mod restore;
pub mod sql;

pub use analysis::{Phase, RestorationPlan, SchemaAnalysis};
pub use config::PgphaseConfig;
pub use error::{PgphaseError, Result};
pub use output::{LibraryOutputHandler, OutputHandler, SilentOutputHandler};
pub use restore::{MissingObjectPolicy, RestorationScript, ScriptOptions};
pub use sql::{
    extract_objects, locate_all, DatabaseObject, ExtractedObjects, LocatedObject, ObjectKind,
    StatementBoundary,
};

/// Extract, locate and bucket every object in `dump`
pub fn plan_restoration(dump: &str, boundary: StatementBoundary) -> RestorationPlan {
    let extracted = extract_objects(dump);
    RestorationPlan::from_located(locate_all(dump, &extracted, boundary))
}

/// Phased restoration script for `dump` with default boundary handling
pub fn restoration_script(dump: &str, options: &ScriptOptions) -> RestorationScript {
    let plan = plan_restoration(dump, StatementBoundary::default());
    restore::render_restoration_script(&plan, options)
}
