#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;

use chrono::{Local, TimeZone};
use pgphase::dump::{ArtifactLayout, ArtifactStore, DumpKind, DumpSource};
use pgphase::error::{PgphaseError, Result};
use tempfile::TempDir;

pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Dump source that hands back fixed text instead of running a command
pub struct StaticDumpSource {
    pub schema: String,
    pub data: String,
}

impl StaticDumpSource {
    pub fn new(schema: &str, data: &str) -> Self {
        Self {
            schema: schema.to_string(),
            data: data.to_string(),
        }
    }
}

impl DumpSource for StaticDumpSource {
    async fn capture(&self, kind: DumpKind) -> Result<String> {
        Ok(match kind {
            DumpKind::Schema => self.schema.clone(),
            DumpKind::DataOnly => self.data.clone(),
        })
    }

    fn describe(&self) -> String {
        "static fixture".to_string()
    }
}

/// Dump source whose every capture fails like a broken dump CLI
pub struct FailingDumpSource;

impl DumpSource for FailingDumpSource {
    async fn capture(&self, _kind: DumpKind) -> Result<String> {
        Err(PgphaseError::DumpCommandFailed {
            command: "supabase db dump".to_string(),
            status: "exit status: 1".to_string(),
            stderr: "Cannot connect to the Docker daemon".to_string(),
        })
    }

    fn describe(&self) -> String {
        "failing fixture".to_string()
    }
}

/// Artifact directories under a temporary root
pub struct TestWorkspace {
    pub temp_dir: TempDir,
    pub layout: ArtifactLayout,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        let layout = ArtifactLayout::under(temp_dir.path());
        layout.ensure().unwrap();
        Self { temp_dir, layout }
    }

    /// Store for a run started at the given wall-clock time
    pub fn store_at(&self, hour: u32, minute: u32, second: u32) -> ArtifactStore {
        let started = Local.with_ymd_and_hms(2025, 6, 29, hour, minute, second).unwrap();
        ArtifactStore::new(self.layout.clone(), started)
    }

    pub fn store(&self) -> ArtifactStore {
        self.store_at(16, 17, 51)
    }

    /// Write `content` as the current schema alias and return its path
    pub fn write_schema(&self, content: &str) -> std::path::PathBuf {
        let path = self.layout.schemas_dir.join("current_schema.sql");
        std::fs::write(&path, content).unwrap();
        path
    }
}
