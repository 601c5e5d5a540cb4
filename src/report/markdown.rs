//! Markdown reports: dependency report, analysis report, recovery manifest.

use std::collections::{BTreeMap, BTreeSet};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use crate::analysis::{Phase, SchemaAnalysis};
use crate::dump::ArtifactLayout;
use crate::report::metadata::BackupSession;
use crate::sql::{DatabaseObject, ExtractedObjects, ObjectKind};

static SECTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^###\s+\d+\.\s+([A-Z]+)\s*(?:\((\d+)\))?\s*$").unwrap());

/// Identifiers selected by a dependency report, per kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSelection {
    kinds: BTreeMap<ObjectKind, BTreeSet<String>>,
}

impl ReportSelection {
    pub fn insert(&mut self, kind: ObjectKind, identifier: impl Into<String>) {
        self.kinds.entry(kind).or_default().insert(identifier.into());
    }

    /// Whether the report lists `object`. Kinds without a section select nothing
    pub fn contains(&self, object: &DatabaseObject) -> bool {
        self.kinds
            .get(&object.kind)
            .map(|ids| ids.contains(&object.identifier()))
            .unwrap_or(false)
    }

    pub fn identifiers(&self, kind: ObjectKind) -> Option<&BTreeSet<String>> {
        self.kinds.get(&kind)
    }

    pub fn len(&self) -> usize {
        self.kinds.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn sorted_identifiers(extracted: &ExtractedObjects, kind: ObjectKind) -> Vec<String> {
    let mut identifiers = extracted.identifiers(kind);
    identifiers.sort();
    identifiers
}

/// Render the dependency report for `extracted`
pub fn render_dependency_report(
    extracted: &ExtractedObjects,
    generated_at: DateTime<Utc>,
    source: Option<&str>,
) -> String {
    let counts = extracted.counts();

    let mut out = String::from("# Database Dependencies Report\n");
    out.push_str(&format!("# Generated on: {}\n", generated_at.format("%Y-%m-%d %H:%M:%S UTC")));
    if let Some(source) = source {
        out.push_str(&format!("# Source: {}\n", source));
    }
    out.push_str("# This file lists every database object found in the dump\n\n");

    out.push_str("## SUMMARY\n");
    for kind in ObjectKind::ALL {
        out.push_str(&format!("Total {}: {}\n", title_case(kind.plural_heading()), counts[&kind]));
    }
    out.push_str(&format!("Total Objects: {}\n\n", extracted.total()));

    out.push_str("## DETAILED BREAKDOWN\n");
    for (i, kind) in ObjectKind::ALL.iter().enumerate() {
        out.push_str(&format!("\n### {}. {} ({})\n", i + 1, kind.plural_heading(), counts[kind]));
        for identifier in sorted_identifiers(extracted, *kind) {
            out.push_str(&format!("- {}\n", identifier));
        }
    }

    out.push_str("\n## DEPENDENCY ORDER RECOMMENDATION\n");
    let mut step = 1;
    for phase in Phase::ALL {
        out.push_str(&format!("\n### Phase {}: {}\n", phase.number(), phase.title()));
        for kind in phase.kinds() {
            out.push_str(&format!("{}. {}\n", step, kind.plural_heading()));
            step += 1;
        }
    }

    let repeated = extracted.repeated();
    out.push_str("\n## NOTES\n");
    out.push_str("- Objects are found by pattern matching on the dump text\n");
    out.push_str("- Dependencies inside one phase are not resolved\n");
    if !repeated.is_empty() {
        out.push_str(&format!(
            "- {} repeated definition(s) kept, e.g. function overloads\n",
            repeated.len()
        ));
    }
    out.push_str("- Always test the restoration order on a development database first\n");

    out
}

/// "TABLES" → "Tables"
fn title_case(heading: &str) -> String {
    let mut chars = heading.chars();
    match chars.next() {
        Some(first) => format!("{}{}", first, chars.as_str().to_lowercase()),
        None => String::new(),
    }
}

/// Read the numbered sections of a dependency report back into a selection.
///
/// Section headings are matched by kind name, so the section numbers do not
/// have to follow the order `render_dependency_report` writes them in.
pub fn parse_dependency_report(markdown: &str) -> ReportSelection {
    let mut selection = ReportSelection::default();
    let mut current: Option<ObjectKind> = None;

    for line in markdown.lines() {
        if line.starts_with('#') {
            current = SECTION_RE
                .captures(line.trim())
                .and_then(|caps| ObjectKind::from_plural_heading(&caps[1]));
            if let Some(kind) = current {
                selection.kinds.entry(kind).or_default();
            }
            continue;
        }

        if let (Some(kind), Some(item)) = (current, line.trim().strip_prefix("- ")) {
            let item = item.trim();
            if !item.is_empty() {
                selection.insert(kind, item);
            }
        }
    }

    debug!("Parsed {} identifier(s) from dependency report", selection.len());
    selection
}

/// Render the structural analysis report
pub fn render_analysis_report(analysis: &SchemaAnalysis, generated_at: DateTime<Utc>) -> String {
    let count = |kind: ObjectKind| analysis.counts.get(&kind).copied().unwrap_or(0);

    let mut out = String::from("# Database Analysis Report\n");
    out.push_str(&format!("Generated on: {}\n\n", generated_at.format("%Y-%m-%d %H:%M:%S UTC")));

    out.push_str("## Overview\n\n");
    for kind in [
        ObjectKind::Schema,
        ObjectKind::Type,
        ObjectKind::Function,
        ObjectKind::Table,
        ObjectKind::Trigger,
        ObjectKind::Index,
        ObjectKind::Policy,
        ObjectKind::Constraint,
    ] {
        out.push_str(&format!("- **Total {}**: {}\n", title_case(kind.plural_heading()), count(kind)));
    }
    out.push_str(&format!("- **Total Relationships**: {}\n", analysis.foreign_keys.len()));

    out.push_str(&format!("\n## Schemas ({})\n\n", analysis.schemas.len()));
    for schema in &analysis.schemas {
        out.push_str(&format!("- `{}`\n", schema));
    }
    out.push_str(&format!("\n## Custom Types ({})\n\n", analysis.types.len()));
    for type_name in &analysis.types {
        out.push_str(&format!("- `{}`\n", type_name));
    }

    out.push_str("\n## Tables\n\n");
    out.push_str(&format!("- **Total Tables**: {}\n", analysis.tables.len()));
    out.push_str(&format!("- **Average Columns per Table**: {:.1}\n", analysis.average_columns()));
    match analysis.largest_table() {
        Some(table) => out.push_str(&format!(
            "- **Largest Table**: {} ({} columns)\n",
            table.qualified_name(),
            table.columns.len()
        )),
        None => out.push_str("- **Largest Table**: N/A\n"),
    }
    for (schema, tables) in analysis.tables_by_schema() {
        out.push_str(&format!("\n### {} ({} tables)\n", schema, tables.len()));
        for table in tables {
            out.push_str(&format!("- `{}` ({} columns)\n", table.name, table.columns.len()));
        }
    }

    out.push_str(&format!("\n## Foreign Key Relationships ({})\n\n", analysis.foreign_keys.len()));
    for fk in &analysis.foreign_keys {
        out.push_str(&format!(
            "- `{}.{}({})` → `{}.{}({})`\n",
            fk.schema,
            fk.table,
            fk.columns.join(", "),
            fk.referenced_schema,
            fk.referenced_table,
            fk.referenced_columns.join(", ")
        ));
    }

    out.push_str("\n## Functions by Schema\n");
    for (schema, functions) in &analysis.functions {
        out.push_str(&format!("\n### {} ({} functions)\n", schema, functions.len()));
        for function in functions {
            out.push_str(&format!("- `{}`\n", function));
        }
    }

    out.push_str(&format!("\n## Row Level Security Policies ({})\n\n", analysis.policies.len()));
    for policy in &analysis.policies {
        out.push_str(&format!("- `{}`\n", policy));
    }

    out.push_str(&format!("\n## Indexes ({})\n\n", analysis.indexes.len()));
    for index in &analysis.indexes {
        out.push_str(&format!("- `{}`\n", index));
    }

    out.push_str("\n## Table Details\n");
    let mut tables: Vec<_> = analysis.tables.iter().collect();
    tables.sort_by_key(|t| t.qualified_name());
    for table in tables {
        out.push_str(&format!("\n### {}\n", table.qualified_name()));
        if !table.located {
            out.push_str("- CREATE TABLE statement not found in the dump\n");
            continue;
        }
        out.push_str(&format!("- **Columns**: {}\n", table.columns.len()));
        for column in &table.columns {
            out.push_str(&format!("- `{}`: {}\n", column.name, column.definition));
        }
    }

    out
}

/// Render the recovery manifest for a finished backup session
pub fn render_recovery_manifest(session: &BackupSession, layout: &ArtifactLayout) -> String {
    let file_named = |prefix: &str| {
        session
            .files_created
            .iter()
            .find(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(prefix) && n.contains(&session.id))
                    .unwrap_or(false)
            })
            .map(|path| path.display().to_string())
    };

    let mut out = String::from("# DATABASE RECOVERY MANIFEST\n\n");
    out.push_str("## Backup Information\n");
    out.push_str(&format!("- **Backup ID**: {}\n", session.id));
    out.push_str(&format!(
        "- **Started**: {}\n",
        session.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(source) = &session.source {
        out.push_str(&format!("- **Dump command**: `{}`\n", source));
    }
    out.push_str(&format!("- **Backup location**: `{}`\n", layout.backups_dir.display()));
    out.push_str(&format!("- **Archive location**: `{}`\n", layout.archive_dir.display()));

    out.push_str("\n## Recovery Procedures\n");
    let procedures = [
        ("complete_backup_", "Complete restoration (schema and data)"),
        ("restoration_", "Phased schema restoration"),
        ("schema_", "Schema-only restoration"),
        ("data_only_", "Data-only restoration (tables must exist)"),
    ];
    for (prefix, title) in procedures {
        if let Some(file) = file_named(prefix) {
            out.push_str(&format!(
                "\n### {}\n```bash\npsql \"$DATABASE_URL\" -f {}\n```\n",
                title, file
            ));
        }
    }

    if let Some(score) = &session.test_score {
        out.push_str(&format!("\n## Content Checks ({} passed)\n\n", score));
        for (check, passed) in &session.test_results {
            out.push_str(&format!("- {} {}\n", if *passed { "✓" } else { "✗" }, check));
        }
    }

    out.push_str("\n## File Integrity Checksums (SHA-256)\n\n");
    for (path, checksum) in &session.checksums {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        out.push_str(&format!("- `{}`: `{}`\n", name, checksum));
    }
    out.push_str("\nRun `pgphase verify <session.json>` to re-check them.\n");

    if !session.statistics.is_empty() {
        let stats = serde_json::to_string_pretty(&session.statistics).unwrap_or_default();
        out.push_str(&format!("\n## Statistics\n```json\n{}\n```\n", stats));
    }

    out.push_str("\n## Notes\n");
    out.push_str("1. Test recovery on a development database first\n");
    out.push_str("2. The data-only dump requires the table structure to exist\n");
    out.push_str("3. Objects marked NOT FOUND in the restoration script need manual attention\n");
    out.push_str("4. Aliases such as latest_complete_backup.sql are overwritten by every run and carry no checksum\n");

    out
}
