use std::time::{Duration, Instant};
use crate::commands::aliases;
use crate::dump::{ArtifactDir, ArtifactRecord, ArtifactStore, DumpKind, DumpSource};
use crate::error::Result;
use crate::log_artifact;
use crate::output::OutputHandler;
#[cfg(feature = "cli")]
use owo_colors::OwoColorize;

#[derive(Debug)]
pub struct DumpResult {
    pub schema: ArtifactRecord,
    pub schema_alias: ArtifactRecord,
    pub data: Option<ArtifactRecord>,
    pub data_alias: Option<ArtifactRecord>,
    /// Dump text, kept so a backup can combine them without re-reading
    pub schema_text: String,
    pub data_text: Option<String>,
    pub duration: Duration,
}

/// Capture the schema dump, and the data-only dump unless `schema_only`
pub async fn execute_dump<S: DumpSource>(
    source: &S,
    store: &ArtifactStore,
    schema_only: bool,
    output: &dyn OutputHandler,
) -> Result<DumpResult> {
    let start = Instant::now();
    store.layout().ensure()?;

    output.status("Dumping", &format!("schema via {}", source.describe()));
    let schema_text = source.capture(DumpKind::Schema).await?;
    let schema = store.write_timestamped(ArtifactDir::Schemas, "schema", "sql", &schema_text)?;
    let schema_alias = store.write_alias(ArtifactDir::Schemas, aliases::SCHEMA, &schema_text)?;
    log_artifact!("schema", schema);
    output.artifact("Wrote", &schema.path);

    let (data, data_alias, data_text) = if schema_only {
        (None, None, None)
    } else {
        output.status("Dumping", "data");
        let data_text = source.capture(DumpKind::DataOnly).await?;
        let data = store.write_timestamped(ArtifactDir::Backups, "data_only", "sql", &data_text)?;
        let alias = store.write_alias(ArtifactDir::Backups, aliases::DATA_ONLY, &data_text)?;
        log_artifact!("data_only", data);
        output.artifact("Wrote", &data.path);
        (Some(data), Some(alias), Some(data_text))
    };

    Ok(DumpResult {
        schema,
        schema_alias,
        data,
        data_alias,
        schema_text,
        data_text,
        duration: start.elapsed(),
    })
}

#[cfg(feature = "cli")]
pub fn print_dump_summary(result: &DumpResult) {
    use crate::logging::{format_duration, format_size};

    println!("\n{}", "=== pgphase Dump Summary ===".bold().blue());
    for record in [Some(&result.schema), result.data.as_ref()].into_iter().flatten() {
        println!(
            "  {} {} ({} lines, {})",
            "✓".green().bold(),
            record.path.display().to_string().cyan(),
            record.lines,
            format_size(record.size_bytes)
        );
    }
    if result.data.is_none() {
        println!("  {} data dump skipped (--schema-only)", "-".bright_black());
    }
    println!("\n{} Completed in {}", "⏱".bright_black(), format_duration(result.duration));
}
