use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use crate::dump::hash_file;
use crate::error::{PgphaseError, Result};
use crate::output::OutputHandler;
use crate::report::BackupSession;
#[cfg(feature = "cli")]
use owo_colors::OwoColorize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumMismatch {
    pub path: PathBuf,
    pub expected: String,
    pub actual: String,
}

#[derive(Debug)]
pub struct VerifyResult {
    pub session_id: String,
    pub verified: Vec<PathBuf>,
    pub mismatched: Vec<ChecksumMismatch>,
    pub missing: Vec<PathBuf>,
}

impl VerifyResult {
    pub fn is_ok(&self) -> bool {
        self.mismatched.is_empty() && self.missing.is_empty()
    }

    /// First problem found, as an error suitable for a non-zero exit
    pub fn first_failure(&self) -> Option<PgphaseError> {
        if let Some(m) = self.mismatched.first() {
            return Some(PgphaseError::ChecksumMismatch {
                path: m.path.clone(),
                expected: m.expected.clone(),
                actual: m.actual.clone(),
            });
        }
        self.missing.first().cloned().map(PgphaseError::FileNotFound)
    }
}

/// Re-hash every file a backup session holds a checksum for.
///
/// Only timestamped artifacts have checksums, so aliases rewritten by later
/// runs do not fail an older session. Relative paths in the session are
/// resolved against `base_dir`.
pub fn execute_verify(
    session_path: &Path,
    base_dir: &Path,
    output: &dyn OutputHandler,
) -> Result<VerifyResult> {
    output.status("Verifying", &session_path.display().to_string());
    let session = BackupSession::load(session_path)?;

    let mut result = VerifyResult {
        session_id: session.id.clone(),
        verified: Vec::new(),
        mismatched: Vec::new(),
        missing: Vec::new(),
    };

    for (recorded, expected) in &session.checksums {
        let path = if recorded.is_absolute() {
            recorded.clone()
        } else {
            base_dir.join(recorded)
        };

        if !path.exists() {
            warn!("Recorded file is missing: {}", path.display());
            output.warning(&format!("Missing: {}", path.display()));
            result.missing.push(path);
            continue;
        }

        let actual = hash_file(&path)?;
        if &actual == expected {
            debug!("Checksum ok: {}", path.display());
            result.verified.push(path);
        } else {
            warn!("Checksum mismatch: {}", path.display());
            output.error(&format!("Checksum mismatch: {}", path.display()));
            result.mismatched.push(ChecksumMismatch {
                path,
                expected: expected.clone(),
                actual,
            });
        }
    }

    if result.is_ok() {
        output.success(&format!("{} file(s) verified", result.verified.len()));
    }
    Ok(result)
}

#[cfg(feature = "cli")]
pub fn print_verify_summary(result: &VerifyResult) {
    println!("\n{}", "=== pgphase Verify Summary ===".bold().blue());
    println!("  {} {}", "Backup ID:".bold(), result.session_id.cyan());
    println!("  {} {} file(s) intact", "✓".green().bold(), result.verified.len());

    for m in &result.mismatched {
        println!("  {} {} changed", "✗".red().bold(), m.path.display().to_string().red());
        println!("      expected {}", m.expected.bright_black());
        println!("      actual   {}", m.actual.bright_black());
    }
    for path in &result.missing {
        println!("  {} {} missing", "✗".red().bold(), path.display().to_string().red());
    }

    if result.is_ok() {
        println!("\n{}", "All recorded files match their checksums.".green());
    } else {
        println!(
            "\n{} {} problem(s) found",
            "✗".red().bold(),
            result.mismatched.len() + result.missing.len()
        );
    }
}
