//! Relocating the full defining statement of an already-extracted object.
//!
//! The extractor only recovers names. To copy an object's SQL into a
//! restoration script the dump is searched again with a pattern anchored on
//! those names; the statement then runs from the anchor to its terminating
//! semicolon, as decided by the configured `StatementBoundary`.

use std::collections::HashMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use crate::error::calculate_line_column;
use crate::sql::extractor::ExtractedObjects;
use crate::sql::lexer;
use crate::sql::objects::{calculate_ddl_hash, DatabaseObject, ObjectKind};

/// How the end of a relocated statement is found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementBoundary {
    /// First `;` after the anchor. Function bodies, string literals and
    /// comments that contain `;` are cut short.
    FirstSemicolon,
    /// First `;` outside literals, quoted identifiers, dollar-quoted bodies
    /// and comments.
    #[default]
    QuoteAware,
}

impl std::str::FromStr for StatementBoundary {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "first_semicolon" | "naive" => Ok(StatementBoundary::FirstSemicolon),
            "quote_aware" => Ok(StatementBoundary::QuoteAware),
            _ => Err(format!(
                "Invalid statement boundary: {}. Use first-semicolon or quote-aware",
                s
            )),
        }
    }
}

/// A statement recovered verbatim from the dump
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub text: String,
    /// Byte offset of the first character in the dump
    pub start: usize,
    /// Byte offset just past the terminating `;`
    pub end: usize,
    /// 1-based line of `start`
    pub start_line: usize,
}

#[derive(Debug, Clone)]
pub struct LocatedObject {
    pub object: DatabaseObject,
    pub statement: Option<Statement>,
    pub ddl_hash: Option<String>,
}

impl LocatedObject {
    pub fn is_found(&self) -> bool {
        self.statement.is_some()
    }
}

/// Regex source for the anchor of `object`'s defining statement
pub fn anchor_pattern(object: &DatabaseObject) -> String {
    let name = quoted(&object.name);
    let schema = object.schema.as_deref().map(quoted).unwrap_or_default();
    let parent = object.parent.as_deref().map(quoted).unwrap_or_default();

    match object.kind {
        ObjectKind::Schema => format!("CREATE SCHEMA IF NOT EXISTS {}", name),
        ObjectKind::Extension => format!("CREATE EXTENSION IF NOT EXISTS {}", name),
        ObjectKind::Type => format!(r"CREATE TYPE {}\.{} AS", schema, name),
        ObjectKind::Sequence => {
            format!(r"CREATE SEQUENCE (?:IF NOT EXISTS )?{}\.{}", schema, name)
        }
        ObjectKind::Table => format!(r"CREATE TABLE IF NOT EXISTS {}\.{}", schema, name),
        ObjectKind::View => format!(r"CREATE (?:OR REPLACE )?VIEW {}\.{}", schema, name),
        ObjectKind::Index => format!(
            r"CREATE (?:UNIQUE )?INDEX (?:IF NOT EXISTS )?{} ON (?:ONLY )?{}\.{}",
            name, schema, parent
        ),
        ObjectKind::Constraint => format!(
            r"ALTER TABLE (?:ONLY )?{}\.{}\s+ADD CONSTRAINT {}",
            schema, parent, name
        ),
        ObjectKind::Policy => format!(r"CREATE POLICY {} ON {}\.{}", name, schema, parent),
        ObjectKind::Function => {
            format!(r"CREATE OR REPLACE FUNCTION {}\.{}\(", schema, name)
        }
        ObjectKind::Trigger => format!(
            r"CREATE (?:OR REPLACE )?(?:CONSTRAINT )?TRIGGER {}[^;]*?\bON {}\.{}",
            name, schema, parent
        ),
        ObjectKind::Comment => {
            let target = regex::escape(object.parent.as_deref().unwrap_or_default());
            let path: Vec<String> = object.path().into_iter().map(quoted).collect();
            format!(r"COMMENT ON {} {}", target, path.join(r"\."))
        }
        ObjectKind::Grant => format!(r"(?m)^GRANT\s+{}\s*;", flexible_whitespace(&object.name)),
    }
}

/// Find the defining statement of `object` in `dump`
pub fn locate(dump: &str, object: &DatabaseObject, boundary: StatementBoundary) -> Option<Statement> {
    let pattern = anchor_pattern(object);
    let regex = match Regex::new(&pattern) {
        Ok(regex) => regex,
        Err(e) => {
            warn!("Could not build relocation pattern for {}: {}", object, e);
            return None;
        }
    };

    let anchor = regex.find_iter(dump).nth(object.occurrence)?;
    statement_from(dump, anchor.start(), boundary)
}

/// Locate every extracted object, keeping extraction order
pub fn locate_all(
    dump: &str,
    extracted: &ExtractedObjects,
    boundary: StatementBoundary,
) -> Vec<LocatedObject> {
    // anchor start offsets per pattern, so repeated keys reuse one scan
    let mut anchors: HashMap<String, Vec<usize>> = HashMap::new();
    let mut located = Vec::with_capacity(extracted.total());

    for object in extracted.iter() {
        let pattern = anchor_pattern(object);
        let starts = anchors.entry(pattern).or_insert_with_key(|pattern| {
            match Regex::new(pattern) {
                Ok(regex) => regex.find_iter(dump).map(|m| m.start()).collect(),
                Err(e) => {
                    warn!("Could not build relocation pattern for {}: {}", object, e);
                    Vec::new()
                }
            }
        });

        let statement = starts
            .get(object.occurrence)
            .and_then(|start| statement_from(dump, *start, boundary));

        match &statement {
            Some(stmt) => debug!("Located {} at line {}", object, stmt.start_line),
            None => debug!("Could not locate {}", object),
        }

        let ddl_hash = statement.as_ref().map(|stmt| calculate_ddl_hash(&stmt.text));
        located.push(LocatedObject {
            object: object.clone(),
            statement,
            ddl_hash,
        });
    }

    located
}

fn statement_from(dump: &str, start: usize, boundary: StatementBoundary) -> Option<Statement> {
    let end = match boundary {
        StatementBoundary::FirstSemicolon => lexer::first_semicolon(dump, start),
        StatementBoundary::QuoteAware => lexer::statement_end(dump, start),
    }?;

    Some(Statement {
        text: dump[start..end].to_string(),
        start,
        end,
        start_line: calculate_line_column(dump, start).0,
    })
}

fn quoted(identifier: &str) -> String {
    format!("\"{}\"", regex::escape(identifier))
}

fn flexible_whitespace(text: &str) -> String {
    text.split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+")
}
