use std::fs;
use std::path::{Path, PathBuf};
use chrono::Utc;
use tracing::{info, warn};
use crate::analysis::{Phase, RestorationPlan};
use crate::commands::{aliases, read_dump};
use crate::dump::{write_atomic, ArtifactDir, ArtifactRecord, ArtifactStore};
use crate::error::{PgphaseError, Result};
use crate::log_artifact;
use crate::output::OutputHandler;
use crate::report::parse_dependency_report;
use crate::restore::{render_restoration_script, MissingObjectPolicy, ScriptOptions};
use crate::sql::{extract_objects, locate_all, StatementBoundary};
#[cfg(feature = "cli")]
use owo_colors::OwoColorize;

#[derive(Debug, Clone, Default)]
pub struct RestoreOptions {
    /// Only restore objects listed in this dependency report
    pub report: Option<PathBuf>,
    pub missing: MissingObjectPolicy,
    pub boundary: StatementBoundary,
    /// Write here instead of the timestamped reports path
    pub output_path: Option<PathBuf>,
}

#[derive(Debug)]
pub struct RestoreResult {
    pub source: PathBuf,
    pub script: ArtifactRecord,
    pub written: usize,
    pub missing: Vec<String>,
    pub phase_counts: Vec<(Phase, usize)>,
    /// Objects dropped because the dependency report did not list them
    pub filtered_out: usize,
}

/// Build the phased restoration script for a dump file
pub fn execute_restore(
    dump_path: &Path,
    store: &ArtifactStore,
    options: &RestoreOptions,
    output: &dyn OutputHandler,
) -> Result<RestoreResult> {
    output.status("Restoring", &format!("script from {}", dump_path.display()));
    let dump = read_dump(dump_path)?;

    let mut extracted = extract_objects(&dump);
    let mut filtered_out = 0;
    if let Some(report_path) = &options.report {
        let markdown = fs::read_to_string(report_path).map_err(|e| PgphaseError::read(report_path, e))?;
        let selection = parse_dependency_report(&markdown);
        if selection.is_empty() {
            output.warning(&format!("{} lists no objects", report_path.display()));
        }
        let before = extracted.total();
        extracted.retain(|object| selection.contains(object));
        filtered_out = before - extracted.total();
        info!(
            "Dependency report {} selected {} of {} object(s)",
            report_path.display(),
            extracted.total(),
            before
        );
    }

    let plan = RestorationPlan::from_located(locate_all(&dump, &extracted, options.boundary));
    let script = render_restoration_script(
        &plan,
        &ScriptOptions {
            missing: options.missing,
            generated_at: Utc::now(),
            source: Some(dump_path.display().to_string()),
        },
    );
    for gap in &script.missing {
        warn!("Not restored: {}", gap);
        output.warning(&format!("Statement not found for {}", gap));
    }

    let record = match &options.output_path {
        Some(path) => {
            write_atomic(path, &script.text)?;
            ArtifactRecord::for_content(path, &script.text)
        }
        None => {
            store.layout().ensure()?;
            let record = store.write_timestamped(ArtifactDir::Reports, "restoration", "sql", &script.text)?;
            store.write_alias(ArtifactDir::Reports, aliases::RESTORATION_SCRIPT, &script.text)?;
            record
        }
    };
    log_artifact!("restoration_script", record);
    output.artifact("Wrote", &record.path);

    Ok(RestoreResult {
        source: dump_path.to_path_buf(),
        script: record,
        written: script.written,
        missing: script.missing,
        phase_counts: plan
            .phases()
            .map(|(phase, objects)| (phase, objects.len()))
            .collect(),
        filtered_out,
    })
}

#[cfg(feature = "cli")]
pub fn print_restore_summary(result: &RestoreResult) {
    println!("\n{}", "=== pgphase Restoration Summary ===".bold().blue());
    for (phase, count) in &result.phase_counts {
        println!("  {:<45} {:>5}", phase.to_string(), count);
    }

    if result.filtered_out > 0 {
        println!("\n  {} object(s) not listed in the report were left out", result.filtered_out);
    }

    if !result.missing.is_empty() {
        println!("\n{}:", "Not Found".bold().yellow());
        for gap in &result.missing {
            println!("  {} {}", "?".yellow().bold(), gap);
        }
    }

    println!(
        "\n{} {} statement(s) written to {}",
        "✓".green().bold(),
        result.written,
        result.script.path.display().to_string().cyan()
    );
}
