use std::path::{Path, PathBuf};
use chrono::Utc;
use crate::analysis::SchemaAnalysis;
use crate::commands::{aliases, read_dump};
use crate::dump::{ArtifactDir, ArtifactRecord, ArtifactStore};
use crate::error::Result;
use crate::log_artifact;
use crate::output::OutputHandler;
use crate::report::render_analysis_report;
use crate::sql::{extract_objects, StatementBoundary};
#[cfg(feature = "cli")]
use owo_colors::OwoColorize;

#[derive(Debug)]
pub struct AnalyzeResult {
    pub source: PathBuf,
    pub tables: usize,
    pub columns: usize,
    pub foreign_keys: usize,
    pub largest_table: Option<(String, usize)>,
    pub report: ArtifactRecord,
}

/// Write the structural analysis report for a dump file
pub fn execute_analyze(
    dump_path: &Path,
    store: &ArtifactStore,
    boundary: StatementBoundary,
    output: &dyn OutputHandler,
) -> Result<AnalyzeResult> {
    output.status("Analyzing", &dump_path.display().to_string());
    let dump = read_dump(dump_path)?;
    store.layout().ensure()?;

    let extracted = extract_objects(&dump);
    let analysis = SchemaAnalysis::build(&dump, &extracted, boundary);
    for table in analysis.tables.iter().filter(|t| !t.located) {
        output.warning(&format!(
            "CREATE TABLE for {} could not be relocated",
            table.qualified_name()
        ));
    }

    let markdown = render_analysis_report(&analysis, Utc::now());
    let report = store.write_timestamped(ArtifactDir::Reports, "analysis", "md", &markdown)?;
    store.write_alias(ArtifactDir::Reports, aliases::ANALYSIS_REPORT, &markdown)?;
    log_artifact!("analysis_report", report);
    output.artifact("Wrote", &report.path);

    Ok(AnalyzeResult {
        source: dump_path.to_path_buf(),
        tables: analysis.tables.len(),
        columns: analysis.total_columns(),
        foreign_keys: analysis.foreign_keys.len(),
        largest_table: analysis
            .largest_table()
            .map(|t| (t.qualified_name(), t.columns.len())),
        report,
    })
}

#[cfg(feature = "cli")]
pub fn print_analyze_summary(result: &AnalyzeResult) {
    println!("\n{}", "=== pgphase Analysis Summary ===".bold().blue());
    println!("  {} {}", "Tables:".bold(), result.tables);
    println!("  {} {}", "Columns:".bold(), result.columns);
    println!("  {} {}", "Foreign keys:".bold(), result.foreign_keys);
    if let Some((name, columns)) = &result.largest_table {
        println!("  {} {} ({} columns)", "Largest table:".bold(), name.cyan(), columns);
    }
    println!("\n  {} {}", "Report:".bold(), result.report.path.display().to_string().cyan());
}
