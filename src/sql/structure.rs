//! Column and foreign-key details pulled from relocated statements.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static FOREIGN_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"ALTER TABLE (?:ONLY )?"([^"]+)"\."([^"]+)"\s+ADD CONSTRAINT "([^"]+)" FOREIGN KEY \(([^)]+)\) REFERENCES "([^"]+)"\."([^"]+)"\(([^)]+)\)"#,
    )
    .unwrap()
});

static LEADING_IDENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?s)^"((?:[^"]|"")+)"\s*(.*)$"#).unwrap());

const TABLE_CONSTRAINT_PREFIXES: [&str; 6] =
    ["CONSTRAINT", "PRIMARY KEY", "UNIQUE", "CHECK", "FOREIGN KEY", "EXCLUDE"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKey {
    pub schema: String,
    pub table: String,
    pub constraint: String,
    pub columns: Vec<String>,
    pub referenced_schema: String,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

/// Columns declared in a `CREATE TABLE` statement.
///
/// The body between the outermost parentheses is split on top-level commas.
/// Entries that start with a table-constraint keyword are skipped; anything
/// else must start with a quoted identifier to count as a column.
pub fn table_columns(create_table: &str) -> Vec<Column> {
    let Some(body) = table_body(create_table) else {
        return Vec::new();
    };

    split_top_level(body)
        .into_iter()
        .filter_map(|entry| {
            let entry = entry.trim();
            let upper = entry.to_uppercase();
            if TABLE_CONSTRAINT_PREFIXES.iter().any(|prefix| upper.starts_with(prefix)) {
                return None;
            }
            let caps = LEADING_IDENT_RE.captures(entry)?;
            Some(Column {
                name: caps[1].replace("\"\"", "\""),
                definition: caps[2].split_whitespace().collect::<Vec<_>>().join(" "),
            })
        })
        .collect()
}

/// Foreign keys declared as `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY`
pub fn foreign_keys(dump: &str) -> Vec<ForeignKey> {
    FOREIGN_KEY_RE
        .captures_iter(dump)
        .map(|caps| ForeignKey {
            schema: caps[1].to_string(),
            table: caps[2].to_string(),
            constraint: caps[3].to_string(),
            columns: split_column_list(&caps[4]),
            referenced_schema: caps[5].to_string(),
            referenced_table: caps[6].to_string(),
            referenced_columns: split_column_list(&caps[7]),
        })
        .collect()
}

fn split_column_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|column| column.trim().trim_matches('"').to_string())
        .filter(|column| !column.is_empty())
        .collect()
}

/// Text between the first `(` and its matching `)`, skipping quoted text
fn table_body(statement: &str) -> Option<&str> {
    let open = statement.find('(')?;
    let mut depth = 0usize;
    let mut i = open;
    let bytes = statement.as_bytes();

    while i < bytes.len() {
        match bytes[i] {
            b'(' => {
                depth += 1;
                i += 1;
            }
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&statement[open + 1..i]);
                }
                i += 1;
            }
            b'\'' | b'"' => i = skip_to_quote_end(statement, i)?,
            _ => i += 1,
        }
    }
    None
}

fn skip_to_quote_end(statement: &str, i: usize) -> Option<usize> {
    let quote = statement.as_bytes()[i] as char;
    let mut j = i + 1;
    while let Some(offset) = statement[j..].find(quote) {
        let close = j + offset;
        if statement[close + 1..].starts_with(quote) {
            j = close + 2;
        } else {
            return Some(close + 1);
        }
    }
    None
}

/// Split on commas that are not nested in parentheses or quotes
fn split_top_level(body: &str) -> Vec<&str> {
    let bytes = body.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b'\'' | b'"' => {
                i = skip_to_quote_end(body, i).unwrap_or(bytes.len());
                continue;
            }
            b',' if depth == 0 => {
                parts.push(&body[last..i]);
                last = i + 1;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                // a comma inside a trailing comment must not split
                let end = body[i..].find('\n').map(|n| i + n).unwrap_or(bytes.len());
                i = end;
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    if last < bytes.len() && !body[last..].trim().is_empty() {
        parts.push(&body[last..]);
    }
    parts
}
