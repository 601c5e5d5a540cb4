//! Full backup run: dumps, content checks, derived SQL, reports, rotation and
//! the session log.

use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime};
use chrono::Utc;
use serde_json::json;
use tracing::info;
use crate::commands::{
    aliases, execute_analyze, execute_dump, execute_extract, execute_restore, read_dump,
    AnalyzeResult, ExtractResult, RestoreOptions, RestoreResult,
};
use crate::dump::{
    check_backup_content, ArtifactDir, ArtifactRecord, ArtifactStore, ContentReport, DumpSource,
    RotationSummary,
};
use crate::error::{PgphaseError, Result};
use crate::output::OutputHandler;
use crate::report::{render_recovery_manifest, BackupSession, OperationStatus};
use crate::restore::MissingObjectPolicy;
use crate::sql::{extract_objects, locate_all, ObjectKind, StatementBoundary};
use crate::{log_artifact, log_error, log_stage};
#[cfg(feature = "cli")]
use owo_colors::OwoColorize;

/// Separates the schema and data parts of a complete backup
pub const DATA_SECTION_MARKER: &str = "\n\n-- DATA SECTION --\n\n";

#[derive(Debug, Clone)]
pub struct BackupOptions {
    /// Skip dumping and work from the current schema alias
    pub analyze_only: bool,
    pub retention_days: u32,
    pub boundary: StatementBoundary,
    pub missing: MissingObjectPolicy,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            analyze_only: false,
            retention_days: crate::config::DEFAULT_RETENTION_DAYS,
            boundary: StatementBoundary::default(),
            missing: MissingObjectPolicy::default(),
        }
    }
}

#[derive(Debug)]
pub struct BackupResult {
    pub session: BackupSession,
    pub session_path: PathBuf,
    pub complete_backup: Option<ArtifactRecord>,
    pub content: ContentReport,
    pub functions_triggers: ArtifactRecord,
    pub extract: ExtractResult,
    pub analyze: AnalyzeResult,
    pub restore: RestoreResult,
    pub rotation: Option<RotationSummary>,
    pub manifest: ArtifactRecord,
    pub duration: Duration,
}

struct PipelineOutput {
    complete_backup: Option<ArtifactRecord>,
    content: ContentReport,
    functions_triggers: ArtifactRecord,
    extract: ExtractResult,
    analyze: AnalyzeResult,
    restore: RestoreResult,
    rotation: Option<RotationSummary>,
}

/// Run the whole backup pipeline.
///
/// On failure the session is still written, as `backup_error_<ts>.json`, and
/// the pipeline error is returned.
pub async fn execute_backup<S: DumpSource>(
    source: &S,
    store: &ArtifactStore,
    options: &BackupOptions,
    output: &dyn OutputHandler,
) -> Result<BackupResult> {
    let start = Instant::now();
    store.layout().ensure()?;

    let mut session = BackupSession::new(store.timestamp(), Utc::now());
    session.source = Some(source.describe());
    output.heading(&format!("Backup {}", store.timestamp()));

    let pipeline = match run_pipeline(source, store, options, &mut session, output).await {
        Ok(pipeline) => pipeline,
        Err(e) => {
            log_error!(e, backup = session.id.as_str());
            session.record_error("backup", &e);
            session.fail(Utc::now());
            // best effort; the pipeline error is returned either way
            if let Ok(json) = session.to_json() {
                if let Ok(record) = store.write_timestamped(ArtifactDir::Reports, "backup_error", "json", &json) {
                    output.artifact("Error log", &record.path);
                }
            }
            return Err(e);
        }
    };

    let manifest_text = render_recovery_manifest(&session, store.layout());
    let manifest = store.write_timestamped(ArtifactDir::Backups, "recovery_manifest", "md", &manifest_text)?;
    let manifest_alias = store.write_alias(ArtifactDir::Backups, aliases::RECOVERY_MANIFEST, &manifest_text)?;
    session.record_artifact(&manifest);
    session.record_alias(&manifest_alias);
    log_artifact!("recovery_manifest", manifest);
    output.artifact("Wrote", &manifest.path);

    session.log_operation("backup", OperationStatus::Success, "pipeline complete");
    session.complete(Utc::now());
    let session_record = store.write_timestamped(ArtifactDir::Reports, "backup_session", "json", &session.to_json()?)?;
    output.artifact("Session", &session_record.path);
    output.success(&format!("Backup {} complete", session.id));

    Ok(BackupResult {
        session,
        session_path: session_record.path,
        complete_backup: pipeline.complete_backup,
        content: pipeline.content,
        functions_triggers: pipeline.functions_triggers,
        extract: pipeline.extract,
        analyze: pipeline.analyze,
        restore: pipeline.restore,
        rotation: pipeline.rotation,
        manifest,
        duration: start.elapsed(),
    })
}

async fn run_pipeline<S: DumpSource>(
    source: &S,
    store: &ArtifactStore,
    options: &BackupOptions,
    session: &mut BackupSession,
    output: &dyn OutputHandler,
) -> Result<PipelineOutput> {
    let layout = store.layout();
    let schema_path = layout.schemas_dir.join(aliases::SCHEMA);

    let (complete_backup, complete_text) = if options.analyze_only {
        log_stage!("dump", "Skipping dumps, analysing {}", schema_path.display());
        session.log_operation("dump", OperationStatus::Skipped, "analyze-only run");
        if !schema_path.exists() {
            return Err(PgphaseError::FileNotFound(schema_path));
        }
        (None, None)
    } else {
        session.log_operation("dump", OperationStatus::Started, "");
        let dumped = execute_dump(source, store, false, output).await?;
        session.record_artifact(&dumped.schema);
        session.record_alias(&dumped.schema_alias);
        session.record_statistic("schema", artifact_stats(&dumped.schema));
        if let (Some(data), Some(alias)) = (&dumped.data, &dumped.data_alias) {
            session.record_artifact(data);
            session.record_alias(alias);
            session.record_statistic("data_only", artifact_stats(data));
        }
        session.log_operation(
            "dump",
            OperationStatus::Success,
            format!("schema {} lines", dumped.schema.lines),
        );

        let complete = format!(
            "{}{}{}",
            dumped.schema_text,
            DATA_SECTION_MARKER,
            dumped.data_text.as_deref().unwrap_or_default()
        );
        let record = store.write_timestamped(ArtifactDir::Backups, "complete_backup", "sql", &complete)?;
        let alias = store.write_alias(ArtifactDir::Backups, aliases::COMPLETE_BACKUP, &complete)?;
        log_artifact!("complete_backup", record);
        output.artifact("Wrote", &record.path);
        session.record_artifact(&record);
        session.record_alias(&alias);
        session.record_statistic("complete_backup", artifact_stats(&record));
        session.log_operation("complete_backup", OperationStatus::Success, record.file_name());
        (Some(record), Some(complete))
    };

    let schema = read_dump(&schema_path)?;

    // analyze-only runs have no data to look at, only the schema
    let content = match &complete_text {
        Some(complete) => check_backup_content(complete, true),
        None => check_backup_content(&schema, false),
    };
    session.record_content_checks(&content);
    let failed: Vec<String> = content
        .failures()
        .map(|f| format!("{} ({})", f.check, f.details))
        .collect();
    if failed.is_empty() {
        session.log_operation("content_check", OperationStatus::Success, content.score());
    } else {
        output.warning(&format!("Content checks failed: {}", failed.join(", ")));
        session.log_operation(
            "content_check",
            OperationStatus::Warning,
            format!("{} passed; failed: {}", content.score(), failed.join(", ")),
        );
    }
    let (functions_text, function_count) = render_functions_triggers(&schema, options.boundary);
    let functions_triggers =
        store.write_timestamped(ArtifactDir::Schemas, "functions_triggers", "sql", &functions_text)?;
    let alias = store.write_alias(ArtifactDir::Schemas, aliases::FUNCTIONS_TRIGGERS, &functions_text)?;
    log_artifact!("functions_triggers", functions_triggers);
    output.artifact("Wrote", &functions_triggers.path);
    session.record_artifact(&functions_triggers);
    session.record_alias(&alias);
    session.log_operation(
        "functions_triggers",
        OperationStatus::Success,
        format!("{} statement(s)", function_count),
    );

    let extract = execute_extract(&schema_path, store, options.boundary, true, output)?;
    session.record_artifact(&extract.report);
    session.record_alias(&extract.report_alias);
    if let Some(json) = &extract.json_report {
        session.record_artifact(json);
    }
    session.record_statistic("objects", &extract.counts);
    session.log_operation(
        "extract",
        if extract.unlocated > 0 { OperationStatus::Warning } else { OperationStatus::Success },
        format!("{} object(s), {} not relocated", extract.total, extract.unlocated),
    );

    let analyze = execute_analyze(&schema_path, store, options.boundary, output)?;
    session.record_artifact(&analyze.report);
    session.record_statistic(
        "structure",
        json!({
            "tables": analyze.tables,
            "columns": analyze.columns,
            "foreign_keys": analyze.foreign_keys,
        }),
    );
    session.log_operation("analyze", OperationStatus::Success, analyze.report.file_name());

    let restore = execute_restore(
        &schema_path,
        store,
        &RestoreOptions {
            report: None,
            missing: options.missing,
            boundary: options.boundary,
            output_path: None,
        },
        output,
    )?;
    session.record_artifact(&restore.script);
    session.record_statistic(
        "restoration",
        json!({ "written": restore.written, "missing": restore.missing.len() }),
    );
    session.log_operation(
        "restoration_script",
        if restore.missing.is_empty() { OperationStatus::Success } else { OperationStatus::Warning },
        format!("{} written, {} missing", restore.written, restore.missing.len()),
    );

    let rotation = if options.analyze_only {
        None
    } else {
        let summary = store.rotate(options.retention_days, SystemTime::now())?;
        session.record_statistic("rotation", &summary);
        session.log_operation(
            "rotation",
            OperationStatus::Success,
            format!("{} archived, {} removed", summary.archived.len(), summary.removed.len()),
        );
        Some(summary)
    };

    info!("Backup pipeline for {} finished", session.id);
    Ok(PipelineOutput {
        complete_backup,
        content,
        functions_triggers,
        extract,
        analyze,
        restore,
        rotation,
    })
}

fn artifact_stats(record: &ArtifactRecord) -> serde_json::Value {
    json!({
        "file": record.path,
        "lines": record.lines,
        "size_bytes": record.size_bytes,
        "sha256": record.sha256,
    })
}

/// Every relocated function and trigger statement, in dump order
pub fn render_functions_triggers(schema: &str, boundary: StatementBoundary) -> (String, usize) {
    let mut extracted = extract_objects(schema);
    extracted.retain(|object| matches!(object.kind, ObjectKind::Function | ObjectKind::Trigger));

    let mut located: Vec<_> = locate_all(schema, &extracted, boundary)
        .into_iter()
        .filter_map(|l| l.statement.map(|stmt| (l.object, stmt)))
        .collect();
    located.sort_by_key(|(_, stmt)| stmt.start);

    let mut text = String::from("-- Functions and triggers extracted from the schema dump\n\n");
    for (object, statement) in &located {
        text.push_str(&format!("-- {} (line {})\n{}\n\n", object, statement.start_line, statement.text));
    }
    (text, located.len())
}

#[cfg(feature = "cli")]
pub fn print_backup_summary(result: &BackupResult) {
    use crate::logging::format_duration;

    println!("\n{}", "=== pgphase Backup Summary ===".bold().blue());
    println!("  {} {}", "Backup ID:".bold(), result.session.id.cyan());
    if let Some(complete) = &result.complete_backup {
        println!("  {} {}", "Complete backup:".bold(), complete.path.display().to_string().cyan());
    }
    println!(
        "  {} {} ({} lines)",
        "Functions/triggers:".bold(),
        result.functions_triggers.path.display().to_string().cyan(),
        result.functions_triggers.lines
    );
    println!("  {} {}", "Dependency report:".bold(), result.extract.report.path.display());
    println!("  {} {}", "Analysis report:".bold(), result.analyze.report.path.display());
    println!("  {} {}", "Restoration script:".bold(), result.restore.script.path.display());
    println!("  {} {}", "Recovery manifest:".bold(), result.manifest.path.display());
    println!("  {} {}", "Session log:".bold(), result.session_path.display());

    if result.content.all_passed() {
        println!("  {} {} content checks passed", "✓".green(), result.content.score());
    } else {
        println!("  {} {} content checks passed", "⚠".yellow(), result.content.score());
        for failure in result.content.failures() {
            println!("      {} {}: {}", "✗".red(), failure.check, failure.details);
        }
    }

    if let Some(rotation) = &result.rotation {
        println!(
            "\n  {} {} old artifact(s) archived, {} removed (retention {} days)",
            "↻".cyan(),
            rotation.archived.len(),
            rotation.removed.len(),
            rotation.retention_days
        );
    }
    if !result.restore.missing.is_empty() {
        println!(
            "  {} {} object(s) could not be relocated; see NOT FOUND lines in the script",
            "⚠".yellow(),
            result.restore.missing.len()
        );
    }

    println!(
        "\n{} {} files recorded in {}",
        "✓".green().bold(),
        result.session.files_created.len(),
        format_duration(result.duration)
    );
}
