use std::collections::BTreeMap;
use serde::Serialize;
use tracing::debug;
use crate::sql::{
    foreign_keys, locate, table_columns, Column, ExtractedObjects, ForeignKey, ObjectKind,
    StatementBoundary,
};

#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub schema: String,
    pub name: String,
    pub columns: Vec<Column>,
    /// False when the `CREATE TABLE` statement could not be relocated
    pub located: bool,
}

impl TableSummary {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

/// Structural overview of a dump, rendered by the analysis report
#[derive(Debug, Clone, Serialize)]
pub struct SchemaAnalysis {
    pub counts: BTreeMap<ObjectKind, usize>,
    pub schemas: Vec<String>,
    pub types: Vec<String>,
    pub tables: Vec<TableSummary>,
    pub foreign_keys: Vec<ForeignKey>,
    /// schema → function names
    pub functions: BTreeMap<String, Vec<String>>,
    pub policies: Vec<String>,
    pub indexes: Vec<String>,
}

impl SchemaAnalysis {
    pub fn build(dump: &str, extracted: &ExtractedObjects, boundary: StatementBoundary) -> Self {
        let tables: Vec<TableSummary> = extracted
            .get(ObjectKind::Table)
            .iter()
            .filter(|table| table.occurrence == 0)
            .map(|table| {
                let statement = locate(dump, table, boundary);
                TableSummary {
                    schema: table.schema.clone().unwrap_or_default(),
                    name: table.name.clone(),
                    columns: statement
                        .as_ref()
                        .map(|stmt| table_columns(&stmt.text))
                        .unwrap_or_default(),
                    located: statement.is_some(),
                }
            })
            .collect();

        let mut functions: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for function in extracted.get(ObjectKind::Function) {
            let names = functions
                .entry(function.schema.clone().unwrap_or_default())
                .or_default();
            if !names.contains(&function.name) {
                names.push(function.name.clone());
            }
        }

        let analysis = Self {
            counts: extracted.counts(),
            schemas: extracted.identifiers(ObjectKind::Schema),
            types: extracted.identifiers(ObjectKind::Type),
            tables,
            foreign_keys: foreign_keys(dump),
            functions,
            policies: extracted.identifiers(ObjectKind::Policy),
            indexes: extracted.identifiers(ObjectKind::Index),
        };
        debug!(
            "Analysed {} tables, {} foreign keys",
            analysis.tables.len(),
            analysis.foreign_keys.len()
        );
        analysis
    }

    pub fn total_columns(&self) -> usize {
        self.tables.iter().map(|t| t.columns.len()).sum()
    }

    pub fn average_columns(&self) -> f64 {
        if self.tables.is_empty() {
            0.0
        } else {
            self.total_columns() as f64 / self.tables.len() as f64
        }
    }

    /// Table with the most columns; the first one wins a tie
    pub fn largest_table(&self) -> Option<&TableSummary> {
        self.tables.iter().fold(None, |best: Option<&TableSummary>, table| match best {
            Some(b) if b.columns.len() >= table.columns.len() => Some(b),
            _ => Some(table),
        })
    }

    pub fn tables_by_schema(&self) -> BTreeMap<&str, Vec<&TableSummary>> {
        let mut grouped: BTreeMap<&str, Vec<&TableSummary>> = BTreeMap::new();
        for table in &self.tables {
            grouped.entry(table.schema.as_str()).or_default().push(table);
        }
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::extract_objects;

    const DUMP: &str = r#"CREATE TABLE IF NOT EXISTS "public"."authors" ("id" uuid NOT NULL, "name" text);
CREATE TABLE IF NOT EXISTS "public"."books" ("id" uuid NOT NULL, "title" text, "author_id" uuid);
CREATE OR REPLACE FUNCTION "public"."f"("a" integer) RETURNS integer LANGUAGE sql AS 'select 1';
CREATE OR REPLACE FUNCTION "public"."f"("a" text) RETURNS integer LANGUAGE sql AS 'select 2';
ALTER TABLE ONLY "public"."books"
    ADD CONSTRAINT "books_author_id_fkey" FOREIGN KEY ("author_id") REFERENCES "public"."authors"("id");
"#;

    #[test]
    fn test_table_statistics() {
        let analysis = SchemaAnalysis::build(DUMP, &extract_objects(DUMP), StatementBoundary::QuoteAware);

        assert_eq!(analysis.tables.len(), 2);
        assert_eq!(analysis.total_columns(), 5);
        assert!((analysis.average_columns() - 2.5).abs() < f64::EPSILON);
        assert_eq!(analysis.largest_table().unwrap().name, "books");
        assert_eq!(analysis.foreign_keys.len(), 1);
    }

    #[test]
    fn test_overloads_listed_once() {
        let analysis = SchemaAnalysis::build(DUMP, &extract_objects(DUMP), StatementBoundary::QuoteAware);

        assert_eq!(analysis.functions["public"], vec!["f".to_string()]);
        assert_eq!(analysis.counts[&ObjectKind::Function], 2);
    }
}
