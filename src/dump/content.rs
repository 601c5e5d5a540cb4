//! Text-level checks on a finished backup.
//!
//! Checksums only prove a file has not changed since it was written. These
//! checks look at what was written: that the dump holds tables, data and
//! functions, is not truncated, and carries no obvious corruption.

use std::collections::BTreeMap;
use std::fmt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Smallest complete backup that is not treated as truncated
pub const MIN_BACKUP_BYTES: usize = 1024;

const CORRUPTION_MARKERS: [&str; 3] = ["\u{FFFD}", "NULL\0", "CORRUPTED"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCheck {
    /// At least one `CREATE TABLE`
    Schema,
    /// At least one `INSERT INTO` or `COPY ... FROM stdin`
    Data,
    /// At least one `CREATE [OR REPLACE] FUNCTION`
    Functions,
    Size,
    Corruption,
    /// Parentheses balance and double quotes pair up outside string literals
    Syntax,
}

impl ContentCheck {
    pub fn label(&self) -> &'static str {
        match self {
            ContentCheck::Schema => "schema",
            ContentCheck::Data => "data",
            ContentCheck::Functions => "functions",
            ContentCheck::Size => "size",
            ContentCheck::Corruption => "corruption",
            ContentCheck::Syntax => "syntax",
        }
    }
}

impl fmt::Display for ContentCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub check: ContentCheck,
    pub passed: bool,
    pub details: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentReport {
    pub outcomes: Vec<CheckOutcome>,
}

impl ContentReport {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn all_passed(&self) -> bool {
        self.passed() == self.total()
    }

    /// "passed/total"
    pub fn score(&self) -> String {
        format!("{}/{}", self.passed(), self.total())
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }

    /// Check label → passed
    pub fn results(&self) -> BTreeMap<String, bool> {
        self.outcomes
            .iter()
            .map(|o| (o.check.label().to_string(), o.passed))
            .collect()
    }

    pub fn outcome(&self, check: ContentCheck) -> Option<&CheckOutcome> {
        self.outcomes.iter().find(|o| o.check == check)
    }
}

/// Run every content check on `content`.
///
/// With `expect_data` false the data check is left out, for runs that only
/// have a schema dump to look at.
pub fn check_backup_content(content: &str, expect_data: bool) -> ContentReport {
    let mut outcomes = Vec::with_capacity(6);

    let tables = content.matches("CREATE TABLE").count();
    outcomes.push(CheckOutcome {
        check: ContentCheck::Schema,
        passed: tables > 0,
        details: format!("{} CREATE TABLE statement(s)", tables),
    });

    if expect_data {
        let inserts = content.matches("INSERT INTO").count();
        let copies = content
            .lines()
            .filter(|line| line.starts_with("COPY ") && line.trim_end().ends_with("FROM stdin;"))
            .count();
        outcomes.push(CheckOutcome {
            check: ContentCheck::Data,
            passed: inserts + copies > 0,
            details: format!("{} INSERT statement(s), {} COPY block(s)", inserts, copies),
        });
    }

    let functions = content.matches("CREATE FUNCTION").count()
        + content.matches("CREATE OR REPLACE FUNCTION").count();
    outcomes.push(CheckOutcome {
        check: ContentCheck::Functions,
        passed: functions > 0,
        details: format!("{} function definition(s)", functions),
    });

    outcomes.push(CheckOutcome {
        check: ContentCheck::Size,
        passed: content.len() >= MIN_BACKUP_BYTES,
        details: format!("{} bytes (minimum {})", content.len(), MIN_BACKUP_BYTES),
    });

    let markers: Vec<&str> = CORRUPTION_MARKERS
        .iter()
        .copied()
        .filter(|marker| content.contains(marker))
        .collect();
    outcomes.push(CheckOutcome {
        check: ContentCheck::Corruption,
        passed: markers.is_empty(),
        details: if markers.is_empty() {
            "no corruption markers".to_string()
        } else {
            format!("found {}", markers.iter().map(|m| format!("{:?}", m)).collect::<Vec<_>>().join(", "))
        },
    });

    let issues = syntax_issues(content);
    outcomes.push(CheckOutcome {
        check: ContentCheck::Syntax,
        passed: issues.is_empty(),
        details: if issues.is_empty() {
            "parentheses and quotes balanced".to_string()
        } else {
            issues.join(", ")
        },
    });

    let report = ContentReport { outcomes };
    for failure in report.failures() {
        warn!("Content check {} failed: {}", failure.check, failure.details);
    }
    debug!("Content checks passed {}", report.score());
    report
}

/// Unbalanced parentheses and unpaired double quotes, ignoring
/// single-quoted literals
fn syntax_issues(content: &str) -> Vec<&'static str> {
    let mut depth: i64 = 0;
    let mut went_negative = false;
    let mut double_quotes = 0usize;
    let mut in_literal = false;

    for c in content.chars() {
        match c {
            // a doubled '' toggles twice and stays in the literal
            '\'' => in_literal = !in_literal,
            _ if in_literal => {}
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                went_negative |= depth < 0;
            }
            '"' => double_quotes += 1,
            _ => {}
        }
    }

    let mut issues = Vec::new();
    if depth != 0 || went_negative {
        issues.push("unmatched parentheses");
    }
    if double_quotes % 2 != 0 {
        issues.push("unmatched double quotes");
    }
    if in_literal {
        issues.push("unterminated string literal");
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn healthy_backup() -> String {
        let mut backup = String::from(concat!(
            "CREATE TABLE IF NOT EXISTS \"public\".\"books\" (\"id\" bigint, \"title\" text);\n",
            "CREATE OR REPLACE FUNCTION \"public\".\"touch\"() RETURNS \"trigger\" AS $$ BEGIN RETURN NEW; END; $$ LANGUAGE plpgsql;\n",
        ));
        while backup.len() < MIN_BACKUP_BYTES {
            backup.push_str("INSERT INTO \"public\".\"books\" (\"id\", \"title\") VALUES (1, 'Can''t stop (won''t stop');\n");
        }
        backup
    }

    #[test]
    fn test_healthy_backup_passes_everything() {
        let report = check_backup_content(&healthy_backup(), true);

        assert_eq!(report.total(), 6);
        assert!(report.all_passed(), "{:?}", report.failures().collect::<Vec<_>>());
        assert_eq!(report.score(), "6/6");
    }

    #[test]
    fn test_truncated_backup() {
        let backup = healthy_backup();
        let truncated = &backup[..200];
        let report = check_backup_content(truncated, true);

        assert!(!report.outcome(ContentCheck::Size).unwrap().passed);
        assert!(!report.all_passed());
    }

    #[test]
    fn test_corruption_markers() {
        let backup = format!("{}-- CORRUPTED block\n", healthy_backup());
        let report = check_backup_content(&backup, true);

        let corruption = report.outcome(ContentCheck::Corruption).unwrap();
        assert!(!corruption.passed);
        assert!(corruption.details.contains("CORRUPTED"));
    }

    #[test]
    fn test_unbalanced_parentheses_outside_literals() {
        let balanced = "INSERT INTO \"t\" VALUES ('a ) b');";
        assert!(syntax_issues(balanced).is_empty());

        let broken = "CREATE TABLE \"t\" (\"id\" int;";
        assert_eq!(syntax_issues(broken), vec!["unmatched parentheses"]);

        let stray_quote = "CREATE TABLE \"t (\"id\" int);";
        assert_eq!(syntax_issues(stray_quote), vec!["unmatched double quotes"]);
    }

    #[test]
    fn test_schema_only_run_skips_data_check() {
        let schema = "CREATE TABLE IF NOT EXISTS \"public\".\"books\" (\"id\" bigint);";
        let report = check_backup_content(schema, false);

        assert!(report.outcome(ContentCheck::Data).is_none());
        assert_eq!(report.total(), 5);
        assert!(report.outcome(ContentCheck::Schema).unwrap().passed);
        assert!(!report.outcome(ContentCheck::Functions).unwrap().passed);
    }

    #[test]
    fn test_results_keyed_by_label() {
        let report = check_backup_content("", true);
        let results = report.results();

        assert_eq!(results.len(), 6);
        assert_eq!(results["schema"], false);
        assert_eq!(results["corruption"], true);
    }
}
