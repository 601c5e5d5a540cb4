pub mod content;
pub mod runner;
pub mod store;

pub use content::{check_backup_content, CheckOutcome, ContentCheck, ContentReport, MIN_BACKUP_BYTES};
pub use runner::{redact_url, CommandDumpSource, DumpKind, DumpSource};
pub use store::{
    hash_file, write_atomic, ArchivedArtifact, ArtifactDir, ArtifactLayout, ArtifactRecord,
    ArtifactStore, RotationSummary,
};
