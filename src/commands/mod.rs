pub mod init;
pub mod dump;
pub mod extract;
pub mod analyze;
pub mod restore;
pub mod backup;
pub mod verify;

use std::fs;
use std::path::Path;
use tracing::warn;
use crate::error::{PgphaseError, Result};

pub use init::{execute_init, InitResult};
pub use dump::{execute_dump, DumpResult};
pub use extract::{execute_extract, ExtractResult};
pub use analyze::{execute_analyze, AnalyzeResult};
pub use restore::{execute_restore, RestoreOptions, RestoreResult};
pub use backup::{execute_backup, BackupOptions, BackupResult};
pub use verify::{execute_verify, VerifyResult};

#[cfg(feature = "cli")]
pub use dump::print_dump_summary;
#[cfg(feature = "cli")]
pub use extract::print_extract_summary;
#[cfg(feature = "cli")]
pub use analyze::print_analyze_summary;
#[cfg(feature = "cli")]
pub use restore::print_restore_summary;
#[cfg(feature = "cli")]
pub use backup::print_backup_summary;
#[cfg(feature = "cli")]
pub use verify::print_verify_summary;

/// Alias names overwritten on every run
pub mod aliases {
    pub const SCHEMA: &str = "current_schema.sql";
    pub const DATA_ONLY: &str = "latest_data_only.sql";
    pub const COMPLETE_BACKUP: &str = "latest_complete_backup.sql";
    pub const FUNCTIONS_TRIGGERS: &str = "latest_functions_triggers.sql";
    pub const DEPENDENCY_REPORT: &str = "database_dependencies_report.md";
    pub const ANALYSIS_REPORT: &str = "database_analysis_report.md";
    pub const RESTORATION_SCRIPT: &str = "ordered_restoration_script.sql";
    pub const RECOVERY_MANIFEST: &str = "RECOVERY_MANIFEST_LATEST.md";
}

/// Read a dump file; invalid UTF-8 is replaced rather than rejected
pub(crate) fn read_dump(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| PgphaseError::read(path, e))?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            warn!("{} is not valid UTF-8; invalid bytes were replaced", path.display());
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}
