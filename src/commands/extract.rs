use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use chrono::Utc;
use tracing::{info, warn};
use crate::commands::{aliases, read_dump};
use crate::dump::{ArtifactDir, ArtifactRecord, ArtifactStore};
use crate::error::Result;
use crate::log_artifact;
use crate::output::OutputHandler;
use crate::report::{render_dependency_report, ExtractionReport};
use crate::sql::{extract_objects, locate_all, ObjectKind, StatementBoundary};
#[cfg(feature = "cli")]
use owo_colors::OwoColorize;

#[derive(Debug)]
pub struct ExtractResult {
    pub source: PathBuf,
    pub counts: BTreeMap<ObjectKind, usize>,
    pub total: usize,
    /// Matches repeating an earlier key (overloads, duplicates)
    pub repeated: usize,
    /// Objects whose defining statement could not be relocated
    pub unlocated: usize,
    pub report: ArtifactRecord,
    pub report_alias: ArtifactRecord,
    pub json_report: Option<ArtifactRecord>,
}

/// Extract objects from a dump file and write the dependency report
pub fn execute_extract(
    dump_path: &Path,
    store: &ArtifactStore,
    boundary: StatementBoundary,
    json: bool,
    output: &dyn OutputHandler,
) -> Result<ExtractResult> {
    output.status("Extracting", &dump_path.display().to_string());
    let dump = read_dump(dump_path)?;
    store.layout().ensure()?;

    let extracted = extract_objects(&dump);
    let repeated = extracted.repeated();
    for object in &repeated {
        warn!("Repeated definition kept: {} (occurrence {})", object, object.occurrence);
    }
    if extracted.is_empty() {
        output.warning("No objects matched; the dump may use a different quoting convention");
    }
    info!("Extracted {} object(s) from {}", extracted.total(), dump_path.display());

    let now = Utc::now();
    let source = dump_path.display().to_string();
    let markdown = render_dependency_report(&extracted, now, Some(&source));
    let report = store.write_timestamped(ArtifactDir::Reports, "dependencies", "md", &markdown)?;
    let report_alias = store.write_alias(ArtifactDir::Reports, aliases::DEPENDENCY_REPORT, &markdown)?;
    log_artifact!("dependency_report", report);
    output.artifact("Wrote", &report.path);

    let located = locate_all(&dump, &extracted, boundary);
    let unlocated = located.iter().filter(|l| !l.is_found()).count();

    let json_report = if json {
        let document = ExtractionReport::new(source, now, &extracted, &located).to_json()?;
        let record = store.write_timestamped(ArtifactDir::Reports, "dependencies", "json", &document)?;
        log_artifact!("dependency_json", record);
        output.artifact("Wrote", &record.path);
        Some(record)
    } else {
        None
    };

    Ok(ExtractResult {
        source: dump_path.to_path_buf(),
        counts: extracted.counts(),
        total: extracted.total(),
        repeated: repeated.len(),
        unlocated,
        report,
        report_alias,
        json_report,
    })
}

#[cfg(feature = "cli")]
pub fn print_extract_summary(result: &ExtractResult) {
    println!("\n{}", "=== pgphase Extraction Summary ===".bold().blue());
    println!("  {} {}", "Source:".bold(), result.source.display().to_string().cyan());
    println!();
    for (kind, count) in &result.counts {
        let line = format!("{:<12} {:>6}", kind.plural_heading().to_lowercase(), count);
        if *count == 0 {
            println!("  {}", line.bright_black());
        } else {
            println!("  {}", line);
        }
    }
    println!("  {:<12} {:>6}", "total".bold(), result.total.to_string().bold());

    if result.repeated > 0 {
        println!("\n  {} {} repeated definition(s) kept", "⚠".yellow(), result.repeated);
    }
    if result.unlocated > 0 {
        println!("  {} {} object(s) could not be relocated", "⚠".yellow(), result.unlocated);
    }
    println!("\n  {} {}", "Report:".bold(), result.report.path.display().to_string().cyan());
    if let Some(json) = &result.json_report {
        println!("  {} {}", "JSON:".bold(), json.path.display().to_string().cyan());
    }
}
