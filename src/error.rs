use std::path::PathBuf;
use thiserror::Error;

/// Main error type for pgphase
#[derive(Error, Debug)]
pub enum PgphaseError {
    // External dump tool errors
    #[error("Failed to start dump command `{command}`: {source}")]
    DumpSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Dump command `{command}` exited with {status}: {stderr}")]
    DumpCommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Dump command `{command}` timed out after {timeout_secs}s")]
    DumpTimeout {
        command: String,
        timeout_secs: u64,
    },

    // File System Errors
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("Failed to read {path}: {message}")]
    FileRead {
        path: PathBuf,
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {message}")]
    FileWrite {
        path: PathBuf,
        message: String,
        #[source]
        source: std::io::Error,
    },

    // Integrity Errors
    #[error("Checksum mismatch for {path}: expected {expected}, found {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Failed to serialize {what}: {source}")]
    Serialization {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    // Configuration Errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to load configuration from {path}: {message}")]
    ConfigLoad {
        path: PathBuf,
        message: String,
    },

    #[error("{0}")]
    Other(String),
}

impl PgphaseError {
    /// Build a read error that keeps the offending path
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => PgphaseError::FileNotFound(path),
            std::io::ErrorKind::PermissionDenied => PgphaseError::PermissionDenied(path),
            _ => PgphaseError::FileRead {
                message: source.to_string(),
                path,
                source,
            },
        }
    }

    /// Build a write error that keeps the offending path
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => PgphaseError::PermissionDenied(path),
            _ => PgphaseError::FileWrite {
                message: source.to_string(),
                path,
                source,
            },
        }
    }

    /// Whether this error came from the external dump tool
    pub fn is_dump_failure(&self) -> bool {
        matches!(
            self,
            PgphaseError::DumpSpawn { .. }
                | PgphaseError::DumpCommandFailed { .. }
                | PgphaseError::DumpTimeout { .. }
        )
    }
}

// io errors go through `read`/`write` so the path is kept
impl From<toml::de::Error> for PgphaseError {
    fn from(err: toml::de::Error) -> Self {
        PgphaseError::ConfigLoad {
            path: PathBuf::from("pgphase.toml"),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for PgphaseError {
    fn from(err: toml::ser::Error) -> Self {
        PgphaseError::Configuration(err.to_string())
    }
}

impl From<serde_json::Error> for PgphaseError {
    fn from(err: serde_json::Error) -> Self {
        PgphaseError::Serialization {
            what: "JSON document".to_string(),
            source: err,
        }
    }
}

/// Result type alias for pgphase operations
pub type Result<T> = std::result::Result<T, PgphaseError>;

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context about which file caused the error
    fn file_context(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<PgphaseError>,
{
    fn file_context(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| {
            let mut err = e.into();
            match &mut err {
                PgphaseError::FileNotFound(p) => *p = path.into(),
                PgphaseError::PermissionDenied(p) => *p = path.into(),
                PgphaseError::FileRead { path: p, .. } => *p = path.into(),
                PgphaseError::FileWrite { path: p, .. } => *p = path.into(),
                PgphaseError::ConfigLoad { path: p, .. } => *p = path.into(),
                _ => {}
            }
            err
        })
    }
}

/// Helper function to format error with all its causes
pub fn format_error_chain(err: &PgphaseError) -> String {
    use std::error::Error;

    let mut output = format!("Error: {}", err);

    let mut current_err: &dyn Error = err;
    while let Some(source) = current_err.source() {
        output.push_str(&format!("\n  Caused by: {}", source));
        current_err = source;
    }

    output
}

/// Helper function to suggest fixes for common errors
pub fn suggest_fix(err: &PgphaseError) -> Option<String> {
    match err {
        PgphaseError::DumpSpawn { command, .. } => Some(format!(
            "Could not start `{}`.\n\
             - Check that the dump tool is installed and on PATH\n\
             - Set `dump_command` in pgphase.toml to the tool you use",
            command
        )),
        PgphaseError::DumpCommandFailed { .. } => Some(
            "The dump tool reported an error.\n\
             - Verify `db_url` and credentials\n\
             - Run the command by hand to see its full output"
                .to_string(),
        ),
        PgphaseError::DumpTimeout { timeout_secs, .. } => Some(format!(
            "The dump did not finish within {}s.\n\
             - Raise `timeout_secs` in pgphase.toml or pass --timeout-secs\n\
             - Check network connectivity to the database",
            timeout_secs
        )),
        PgphaseError::FileNotFound(path) => Some(format!(
            "File not found: {}\n\
             - Check if the path is correct\n\
             - Run `pgphase dump` first to create the schema files",
            path.display()
        )),
        PgphaseError::PermissionDenied(path) => Some(format!(
            "Permission denied for: {}\n\
             - Check file permissions\n\
             - You may need to run with appropriate privileges",
            path.display()
        )),
        PgphaseError::ChecksumMismatch { path, .. } => Some(format!(
            "{} changed since the backup was recorded.\n\
             - Do not restore from this file without inspecting it",
            path.display()
        )),
        PgphaseError::ConfigLoad { path, .. } => Some(format!(
            "Could not parse {}.\n\
             - Run `pgphase init` for a sample configuration",
            path.display()
        )),
        _ => None,
    }
}

/// Calculate line and column number from a byte position in text
pub fn calculate_line_column(text: &str, byte_position: usize) -> (usize, usize) {
    let mut line = 1;
    let mut column = 1;
    let mut current_pos = 0;

    for ch in text.chars() {
        if current_pos >= byte_position {
            break;
        }

        current_pos += ch.len_utf8();

        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }

    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_line_column() {
        let sql = "CREATE SCHEMA IF NOT EXISTS \"app\";\nCREATE TYPE \"app\".\"mood\" AS ENUM ('ok');";

        assert_eq!(calculate_line_column(sql, 0), (1, 1));
        assert_eq!(calculate_line_column(sql, 7), (1, 8));
        // first byte of the second statement
        assert_eq!(calculate_line_column(sql, 35), (2, 1));
    }

    #[test]
    fn test_calculate_line_column_with_unicode() {
        let sql = "SELECT '🎉' FROM t\nWHERE x = 1";

        assert_eq!(calculate_line_column(sql, 8), (1, 9));
        assert_eq!(calculate_line_column(sql, 12), (1, 10));
    }

    #[test]
    fn test_read_error_keeps_path() {
        let err = PgphaseError::read(
            "dumps/schema.sql",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        match err {
            PgphaseError::FileNotFound(path) => assert_eq!(path, PathBuf::from("dumps/schema.sql")),
            other => panic!("Expected FileNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_dump_failure_classification() {
        let timeout = PgphaseError::DumpTimeout {
            command: "pg_dump".to_string(),
            timeout_secs: 5,
        };
        assert!(timeout.is_dump_failure());
        assert!(!PgphaseError::Other("x".to_string()).is_dump_failure());
    }
}
