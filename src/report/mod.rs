pub mod markdown;
pub mod metadata;

pub use markdown::{
    parse_dependency_report, render_analysis_report, render_dependency_report,
    render_recovery_manifest, ReportSelection,
};
pub use metadata::{
    BackupSession, ExtractionReport, OperationRecord, OperationStatus, ReportedObject,
    SessionError, SessionStatus,
};
