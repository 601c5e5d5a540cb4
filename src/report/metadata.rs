//! JSON documents written next to the SQL artifacts.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::dump::{ArtifactRecord, ContentReport};
use crate::error::{PgphaseError, Result};
use crate::sql::{ExtractedObjects, LocatedObject, ObjectKind};

/// One object as listed in the extraction report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedObject {
    pub kind: ObjectKind,
    pub identifier: String,
    pub occurrence: usize,
    /// 1-based line of the defining statement, when it could be relocated
    pub line: Option<usize>,
    pub ddl_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub source: String,
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub counts: BTreeMap<ObjectKind, usize>,
    pub objects: Vec<ReportedObject>,
}

impl ExtractionReport {
    pub fn new(
        source: impl Into<String>,
        generated_at: DateTime<Utc>,
        extracted: &ExtractedObjects,
        located: &[LocatedObject],
    ) -> Self {
        Self {
            source: source.into(),
            generated_at,
            total: extracted.total(),
            counts: extracted.counts(),
            objects: located
                .iter()
                .map(|l| ReportedObject {
                    kind: l.object.kind,
                    identifier: l.object.identifier(),
                    occurrence: l.object.occurrence,
                    line: l.statement.as_ref().map(|s| s.start_line),
                    ddl_hash: l.ddl_hash.clone(),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|source| PgphaseError::Serialization {
            what: "extraction report".to_string(),
            source,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Started,
    Success,
    Warning,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub operation: String,
    pub status: OperationStatus,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionError {
    pub operation: String,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

/// Audit log of one backup run, saved as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSession {
    /// Run timestamp, `YYYYmmdd_HHMMSS`
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<f64>,
    pub status: SessionStatus,
    /// Dump command with the password masked
    pub source: Option<String>,
    pub operations: Vec<OperationRecord>,
    pub statistics: BTreeMap<String, serde_json::Value>,
    pub errors: Vec<SessionError>,
    pub files_created: Vec<PathBuf>,
    /// path → sha256 of every timestamped file in `files_created`.
    /// Aliases are rewritten by later runs and have no entry.
    pub checksums: BTreeMap<PathBuf, String>,
    /// Content check label → passed
    #[serde(default)]
    pub test_results: BTreeMap<String, bool>,
    /// "passed/total" of the content checks, once they ran
    #[serde(default)]
    pub test_score: Option<String>,
}

impl BackupSession {
    pub fn new(id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            started_at,
            completed_at: None,
            duration_seconds: None,
            status: SessionStatus::Running,
            source: None,
            operations: Vec::new(),
            statistics: BTreeMap::new(),
            errors: Vec::new(),
            files_created: Vec::new(),
            checksums: BTreeMap::new(),
            test_results: BTreeMap::new(),
            test_score: None,
        }
    }

    pub fn log_operation(&mut self, operation: &str, status: OperationStatus, details: impl Into<String>) {
        self.operations.push(OperationRecord {
            operation: operation.to_string(),
            status,
            details: details.into(),
            timestamp: Utc::now(),
        });
    }

    /// Track a written file and its checksum
    pub fn record_artifact(&mut self, record: &ArtifactRecord) {
        if !self.files_created.contains(&record.path) {
            self.files_created.push(record.path.clone());
        }
        self.checksums.insert(record.path.clone(), record.sha256.clone());
    }

    /// Track an alias without a checksum; later runs overwrite it
    pub fn record_alias(&mut self, record: &ArtifactRecord) {
        if !self.files_created.contains(&record.path) {
            self.files_created.push(record.path.clone());
        }
    }

    pub fn record_content_checks(&mut self, report: &ContentReport) {
        self.test_results = report.results();
        self.test_score = Some(report.score());
    }

    /// Store `value` under `statistics[key]`; values that fail to serialise are skipped
    pub fn record_statistic(&mut self, key: &str, value: impl Serialize) {
        if let Ok(value) = serde_json::to_value(value) {
            self.statistics.insert(key.to_string(), value);
        }
    }

    pub fn record_error(&mut self, operation: &str, error: &PgphaseError) {
        self.errors.push(SessionError {
            operation: operation.to_string(),
            error: error.to_string(),
            timestamp: Utc::now(),
        });
    }

    pub fn complete(&mut self, at: DateTime<Utc>) {
        self.finish(at, SessionStatus::Completed);
    }

    pub fn fail(&mut self, at: DateTime<Utc>) {
        self.finish(at, SessionStatus::Failed);
    }

    fn finish(&mut self, at: DateTime<Utc>, status: SessionStatus) {
        self.completed_at = Some(at);
        self.duration_seconds = Some((at - self.started_at).num_milliseconds() as f64 / 1000.0);
        self.status = status;
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|source| PgphaseError::Serialization {
            what: "backup session".to_string(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| PgphaseError::read(path, e))?;
        serde_json::from_str(&content).map_err(|source| PgphaseError::Serialization {
            what: format!("backup session {}", path.display()),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_session_round_trip_and_duration() {
        let started = DateTime::parse_from_rfc3339("2025-06-29T16:17:51Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut session = BackupSession::new("20250629_161751", started);
        session.log_operation("schema_dump", OperationStatus::Success, "12 lines");
        session.record_artifact(&ArtifactRecord::for_content("schemas/a.sql", "SELECT 1;"));
        session.record_artifact(&ArtifactRecord::for_content("schemas/a.sql", "SELECT 1;"));
        session.record_statistic("schema", serde_json::json!({ "lines": 1 }));
        session.complete(started + Duration::milliseconds(2500));

        assert_eq!(session.files_created.len(), 1);
        assert_eq!(session.duration_seconds, Some(2.5));

        let json = session.to_json().unwrap();
        assert!(json.contains("\"status\": \"completed\""));
        let parsed: BackupSession = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, session);
    }

    #[test]
    fn test_aliases_carry_no_checksum() {
        let mut session = BackupSession::new("20250629_161751", Utc::now());
        session.record_artifact(&ArtifactRecord::for_content("schemas/schema_20250629_161751.sql", "SELECT 1;"));
        session.record_alias(&ArtifactRecord::for_content("schemas/current_schema.sql", "SELECT 1;"));

        assert_eq!(session.files_created.len(), 2);
        assert_eq!(session.checksums.len(), 1);
        assert!(!session.checksums.contains_key(&PathBuf::from("schemas/current_schema.sql")));
    }

    #[test]
    fn test_sessions_without_content_checks_still_load() {
        let mut session = BackupSession::new("20250101_000000", Utc::now());
        session.record_content_checks(&crate::dump::check_backup_content("", false));
        assert_eq!(session.test_score.as_deref(), Some("2/5"));

        let mut json: serde_json::Value = serde_json::from_str(&session.to_json().unwrap()).unwrap();
        let fields = json.as_object_mut().unwrap();
        fields.remove("test_results");
        fields.remove("test_score");

        let loaded: BackupSession = serde_json::from_value(json).unwrap();
        assert!(loaded.test_results.is_empty());
        assert_eq!(loaded.test_score, None);
    }

    #[test]
    fn test_failed_session_keeps_errors() {
        let mut session = BackupSession::new("x", Utc::now());
        let error = PgphaseError::DumpTimeout {
            command: "npx supabase db dump".into(),
            timeout_secs: 600,
        };
        session.record_error("schema_dump", &error);
        session.fail(Utc::now());

        assert_eq!(session.status, SessionStatus::Failed);
        assert!(session.errors[0].error.contains("timed out after 600s"));
    }
}
