//! On-disk layout for dumps, reports and restoration scripts.
//!
//! Every artifact is written twice at most: once under a timestamped name
//! that rotation may later archive and then remove, and optionally under a
//! fixed alias that is overwritten each run and never rotated.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use crate::error::{PgphaseError, Result};
use crate::sql::sha256_hex;

/// Prefixes of timestamped artifacts that rotation may archive or delete
pub const ROTATED_PREFIXES: [&str; 5] = [
    "schema",
    "complete_backup",
    "data_only",
    "functions_triggers",
    "restoration",
];

static TIMESTAMPED_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z_]+)_(\d{8}_\d{6})\.[A-Za-z0-9.]+$").unwrap());

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Subdirectory of the backups directory that holds rotated-out artifacts
pub const ARCHIVE_DIR_NAME: &str = "archive";

/// Archived artifacts are deleted once this many retention periods old
pub const ARCHIVE_RETENTION_FACTOR: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactDir {
    Schemas,
    Backups,
    Reports,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLayout {
    pub schemas_dir: PathBuf,
    pub backups_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub archive_dir: PathBuf,
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self::under(Path::new("."))
    }
}

impl ArtifactLayout {
    /// Default directory names below `root`
    pub fn under(root: &Path) -> Self {
        Self::new(root.join("schemas"), root.join("db_backups"), root.join("reports"))
    }

    /// Layout with the archive directory inside `backups_dir`
    pub fn new(schemas_dir: PathBuf, backups_dir: PathBuf, reports_dir: PathBuf) -> Self {
        Self {
            archive_dir: backups_dir.join(ARCHIVE_DIR_NAME),
            schemas_dir,
            backups_dir,
            reports_dir,
        }
    }

    pub fn dir(&self, which: ArtifactDir) -> &Path {
        match which {
            ArtifactDir::Schemas => &self.schemas_dir,
            ArtifactDir::Backups => &self.backups_dir,
            ArtifactDir::Reports => &self.reports_dir,
        }
    }

    /// Create every directory that does not exist yet
    pub fn ensure(&self) -> Result<()> {
        for dir in [&self.schemas_dir, &self.backups_dir, &self.reports_dir] {
            if !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| PgphaseError::write(dir, e))?;
                debug!("Created directory {}", dir.display());
            }
        }
        Ok(())
    }
}

/// Facts recorded for every file written by a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub path: PathBuf,
    pub lines: usize,
    pub size_bytes: u64,
    pub sha256: String,
}

impl ArtifactRecord {
    pub fn for_content(path: impl Into<PathBuf>, content: &str) -> Self {
        Self {
            path: path.into(),
            lines: content.lines().count(),
            size_bytes: content.len() as u64,
            sha256: sha256_hex(content.as_bytes()),
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchivedArtifact {
    pub from: PathBuf,
    pub to: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RotationSummary {
    /// Moved into the archive directory
    pub archived: Vec<ArchivedArtifact>,
    /// Deleted, from the artifact directories or from the archive
    pub removed: Vec<PathBuf>,
    pub kept: usize,
    pub retention_days: u32,
}

/// Writes artifacts for one run, all sharing the run's timestamp
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    layout: ArtifactLayout,
    timestamp: String,
}

impl ArtifactStore {
    pub fn new(layout: ArtifactLayout, started_at: DateTime<Local>) -> Self {
        Self {
            layout,
            timestamp: started_at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Run timestamp in `YYYYmmdd_HHMMSS` form
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn timestamped_path(&self, which: ArtifactDir, prefix: &str, ext: &str) -> PathBuf {
        self.layout
            .dir(which)
            .join(format!("{}_{}.{}", prefix, self.timestamp, ext))
    }

    /// Write `<prefix>_<timestamp>.<ext>`
    pub fn write_timestamped(
        &self,
        which: ArtifactDir,
        prefix: &str,
        ext: &str,
        content: &str,
    ) -> Result<ArtifactRecord> {
        let path = self.timestamped_path(which, prefix, ext);
        write_atomic(&path, content)?;
        info!("Wrote {} ({} bytes)", path.display(), content.len());
        Ok(ArtifactRecord::for_content(path, content))
    }

    /// Write a fixed-name alias, replacing the previous run's copy
    pub fn write_alias(&self, which: ArtifactDir, name: &str, content: &str) -> Result<ArtifactRecord> {
        let path = self.layout.dir(which).join(name);
        write_atomic(&path, content)?;
        debug!("Updated alias {}", path.display());
        Ok(ArtifactRecord::for_content(path, content))
    }

    /// Archive timestamped artifacts older than `retention_days` and delete
    /// those older than three retention periods, archived ones included.
    pub fn rotate(&self, retention_days: u32, now: SystemTime) -> Result<RotationSummary> {
        let period = Duration::from_secs(u64::from(retention_days) * 24 * 60 * 60);
        let archive_after = now.checked_sub(period).unwrap_or(SystemTime::UNIX_EPOCH);
        let delete_after = now
            .checked_sub(period * ARCHIVE_RETENTION_FACTOR)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let mut summary = RotationSummary {
            retention_days,
            ..Default::default()
        };

        for dir in [&self.layout.schemas_dir, &self.layout.backups_dir, &self.layout.reports_dir] {
            for (path, modified) in self.rotation_candidates(dir)? {
                if modified < delete_after {
                    fs::remove_file(&path).map_err(|e| PgphaseError::write(&path, e))?;
                    debug!("Rotated out {}", path.display());
                    summary.removed.push(path);
                } else if modified < archive_after {
                    let archived = self.archive(&path)?;
                    summary.archived.push(archived);
                } else {
                    summary.kept += 1;
                }
            }
        }

        for (path, modified) in self.rotation_candidates(&self.layout.archive_dir)? {
            if modified < delete_after {
                fs::remove_file(&path).map_err(|e| PgphaseError::write(&path, e))?;
                debug!("Removed archived {}", path.display());
                summary.removed.push(path);
            }
        }

        info!(
            "Rotation archived {} file(s), removed {}, kept {} (retention {} days)",
            summary.archived.len(),
            summary.removed.len(),
            summary.kept,
            retention_days
        );
        Ok(summary)
    }

    /// Rotated-prefix files in `dir` with their modification time, this run's excluded
    fn rotation_candidates(&self, dir: &Path) -> Result<Vec<(PathBuf, SystemTime)>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut candidates = Vec::new();
        let entries = fs::read_dir(dir).map_err(|e| PgphaseError::read(dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| PgphaseError::read(dir, e))?;
            let path = entry.path();
            if !path.is_file() || !is_rotated_artifact(&path) {
                continue;
            }
            // never rotate out this run's own files
            if entry.file_name().to_string_lossy().contains(&self.timestamp) {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .map_err(|e| PgphaseError::read(&path, e))?;
            candidates.push((path, modified));
        }
        Ok(candidates)
    }

    fn archive(&self, path: &Path) -> Result<ArchivedArtifact> {
        let archive_dir = &self.layout.archive_dir;
        if !archive_dir.exists() {
            fs::create_dir_all(archive_dir).map_err(|e| PgphaseError::write(archive_dir, e))?;
        }
        let to = match path.file_name() {
            Some(name) => archive_dir.join(name),
            None => return Err(PgphaseError::Other(format!("Cannot archive {}", path.display()))),
        };
        fs::rename(path, &to).map_err(|e| PgphaseError::write(&to, e))?;
        debug!("Archived {} to {}", path.display(), to.display());
        Ok(ArchivedArtifact {
            from: path.to_path_buf(),
            to,
        })
    }
}

/// Whether `path` is a timestamped artifact with a rotated prefix
pub fn is_rotated_artifact(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    TIMESTAMPED_NAME_RE
        .captures(name)
        .map(|caps| ROTATED_PREFIXES.contains(&&caps[1]))
        .unwrap_or(false)
}

/// Write through a temp file in the same directory, then rename over `path`
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| PgphaseError::write(dir, e))?;
    }

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| PgphaseError::write(path, e))?;
    tmp.write_all(content.as_bytes())
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| PgphaseError::write(path, e))?;
    tmp.persist(path)
        .map_err(|e| PgphaseError::write(path, e.error))?;
    Ok(())
}

/// SHA-256 of a file on disk
pub fn hash_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| PgphaseError::read(path, e))?;
    Ok(sha256_hex(&bytes))
}
