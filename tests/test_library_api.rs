mod common;

use common::{fixtures, init_test_tracing, TestWorkspace};
use pgphase::commands::execute_init;
use pgphase::config::{CliOverrides, SAMPLE_CONFIG_FILE_NAME};
use pgphase::output::OutputLevel;
use pgphase::{
    plan_restoration, restoration_script, LibraryOutputHandler, MissingObjectPolicy, Phase,
    PgphaseConfig, SchemaAnalysis, ScriptOptions, StatementBoundary,
};

#[test]
fn test_plan_groups_objects_by_phase() {
    init_test_tracing();

    let plan = plan_restoration(fixtures::dumps::BOOKS, StatementBoundary::QuoteAware);
    let per_phase: Vec<(u8, usize)> = plan
        .phases()
        .map(|(phase, objects)| (phase.number(), objects.len()))
        .collect();

    assert_eq!(per_phase, vec![(1, 2), (2, 1), (3, 3), (4, 3), (5, 3), (6, 3)]);
    assert_eq!(plan.len(), 15);
    assert_eq!(plan.missing().count(), 0);
    for located in plan.objects_in(Phase::Tables) {
        assert_eq!(Phase::of(located.object.kind), Phase::Tables);
    }
}

#[test]
fn test_restoration_script_convenience() {
    let script = restoration_script(fixtures::dumps::BOOKS, &ScriptOptions::default());

    assert!(script.is_complete());
    assert_eq!(script.written, 15);
    assert!(script.text.starts_with("-- Database Restoration Script\n"));
    assert!(script.text.contains("-- You may now need to:"));
}

#[test]
fn test_schema_analysis() {
    let extracted = pgphase::extract_objects(fixtures::dumps::BOOKS);
    let analysis = SchemaAnalysis::build(fixtures::dumps::BOOKS, &extracted, StatementBoundary::QuoteAware);

    assert_eq!(analysis.tables.len(), 2);
    assert_eq!(analysis.total_columns(), 7);
    assert!((analysis.average_columns() - 3.5).abs() < f64::EPSILON);

    let books = analysis.largest_table().unwrap();
    assert_eq!(books.qualified_name(), "public.books");
    let names: Vec<&str> = books.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "author_id", "title", "status", "updated_at"]);

    assert_eq!(analysis.foreign_keys.len(), 1);
    let fk = &analysis.foreign_keys[0];
    assert_eq!(fk.table, "books");
    assert_eq!(fk.referenced_table, "authors");
}

#[test]
fn test_config_merge_prefers_cli() {
    let file = PgphaseConfig {
        timeout_secs: Some(120),
        retention_days: Some(7),
        missing_objects: Some(MissingObjectPolicy::Skip),
        ..Default::default()
    };
    let merged = PgphaseConfig::merge_with_cli(
        Some(file),
        CliOverrides {
            timeout_secs: Some(30),
            ..Default::default()
        },
    );

    assert_eq!(merged.timeout_secs(), 30);
    assert_eq!(merged.retention_days(), 7);
    assert_eq!(merged.missing_objects(), MissingObjectPolicy::Skip);
    assert_eq!(merged.statement_boundary(), StatementBoundary::QuoteAware);
}

#[test]
fn test_init_writes_loadable_sample() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = TestWorkspace::new();
    let output = LibraryOutputHandler::new();

    let result = execute_init(workspace.temp_dir.path(), &output)?;
    assert!(result.sample_path.ends_with(SAMPLE_CONFIG_FILE_NAME));

    let loaded = PgphaseConfig::load_from(&result.sample_path)?.unwrap();
    assert_eq!(loaded, PgphaseConfig::sample());
    assert!(!output.messages_at(OutputLevel::Success).is_empty());
    Ok(())
}
