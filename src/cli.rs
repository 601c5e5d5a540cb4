use clap::{Parser, Subcommand};
use std::path::PathBuf;
use crate::restore::MissingObjectPolicy;
use crate::sql::StatementBoundary;

#[derive(Parser, Clone)]
#[command(name = "pgphase")]
#[command(about = "Phased PostgreSQL dump analysis and restoration scripts")]
#[command(version)]
pub struct Cli {
    /// Increase verbosity level (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file
    #[arg(long, global = true, default_value = "pgphase.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Generate a sample configuration file
    Init,

    /// Capture schema and data dumps through the dump command
    Dump {
        /// Database URL passed to the dump command
        #[arg(long)]
        db_url: Option<String>,

        /// Dump program and leading arguments, e.g. "pg_dump --no-owner"
        #[arg(long)]
        dump_command: Option<String>,

        /// Skip the data-only dump
        #[arg(long)]
        schema_only: bool,

        /// Seconds before the dump command is killed
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// List every object found in a dump and write the dependency report
    Extract {
        /// Schema dump to read (defaults to the current schema alias)
        #[arg(value_name = "DUMP")]
        dump: Option<PathBuf>,

        /// Also write a JSON report
        #[arg(long)]
        json: bool,

        /// How relocated statements end
        #[arg(long)]
        boundary: Option<StatementBoundary>,
    },

    /// Write the structural analysis report for a dump
    Analyze {
        /// Schema dump to read (defaults to the current schema alias)
        #[arg(value_name = "DUMP")]
        dump: Option<PathBuf>,
    },

    /// Generate a phased restoration script from a dump
    Restore {
        /// Schema dump to read (defaults to the current schema alias)
        #[arg(value_name = "DUMP")]
        dump: Option<PathBuf>,

        /// Only restore objects listed in this dependency report
        #[arg(long)]
        report: Option<PathBuf>,

        /// Script path (defaults to a timestamped file under the reports directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// placeholder or skip
        #[arg(long)]
        missing: Option<MissingObjectPolicy>,

        /// quote-aware or first-semicolon
        #[arg(long)]
        boundary: Option<StatementBoundary>,
    },

    /// Run the full backup pipeline
    Backup {
        /// Database URL passed to the dump command
        #[arg(long)]
        db_url: Option<String>,

        /// Dump program and leading arguments, e.g. "pg_dump --no-owner"
        #[arg(long)]
        dump_command: Option<String>,

        /// Reuse the current schema dump instead of dumping again
        #[arg(long)]
        analyze_only: bool,

        /// Days to keep timestamped artifacts
        #[arg(long)]
        retention_days: Option<u32>,

        /// Seconds before the dump command is killed
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Check the files of a backup session against their recorded checksums
    Verify {
        /// backup_session_<timestamp>.json
        #[arg(value_name = "SESSION")]
        session: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
