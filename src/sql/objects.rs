use std::fmt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Kinds of database objects recognised in a dump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Schema,
    Extension,
    Type,
    Sequence,
    Table,
    View,
    Index,
    Constraint,
    Policy,
    Function,
    Trigger,
    Comment,
    Grant,
}

impl ObjectKind {
    /// Every kind, in report order
    pub const ALL: [ObjectKind; 13] = [
        ObjectKind::Schema,
        ObjectKind::Extension,
        ObjectKind::Type,
        ObjectKind::Sequence,
        ObjectKind::Table,
        ObjectKind::View,
        ObjectKind::Index,
        ObjectKind::Constraint,
        ObjectKind::Policy,
        ObjectKind::Function,
        ObjectKind::Trigger,
        ObjectKind::Comment,
        ObjectKind::Grant,
    ];

    /// Singular lowercase label, e.g. "table"
    pub fn label(&self) -> &'static str {
        match self {
            ObjectKind::Schema => "schema",
            ObjectKind::Extension => "extension",
            ObjectKind::Type => "type",
            ObjectKind::Sequence => "sequence",
            ObjectKind::Table => "table",
            ObjectKind::View => "view",
            ObjectKind::Index => "index",
            ObjectKind::Constraint => "constraint",
            ObjectKind::Policy => "policy",
            ObjectKind::Function => "function",
            ObjectKind::Trigger => "trigger",
            ObjectKind::Comment => "comment",
            ObjectKind::Grant => "grant",
        }
    }

    /// Plural heading used by reports, e.g. "TABLES"
    pub fn plural_heading(&self) -> &'static str {
        match self {
            ObjectKind::Schema => "SCHEMAS",
            ObjectKind::Extension => "EXTENSIONS",
            ObjectKind::Type => "TYPES",
            ObjectKind::Sequence => "SEQUENCES",
            ObjectKind::Table => "TABLES",
            ObjectKind::View => "VIEWS",
            ObjectKind::Index => "INDEXES",
            ObjectKind::Constraint => "CONSTRAINTS",
            ObjectKind::Policy => "POLICIES",
            ObjectKind::Function => "FUNCTIONS",
            ObjectKind::Trigger => "TRIGGERS",
            ObjectKind::Comment => "COMMENTS",
            ObjectKind::Grant => "GRANTS",
        }
    }

    /// Inverse of `plural_heading`
    pub fn from_plural_heading(heading: &str) -> Option<Self> {
        let heading = heading.trim();
        ObjectKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.plural_heading().eq_ignore_ascii_case(heading))
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Schema => write!(f, "SCHEMA"),
            ObjectKind::Extension => write!(f, "EXTENSION"),
            ObjectKind::Type => write!(f, "TYPE"),
            ObjectKind::Sequence => write!(f, "SEQUENCE"),
            ObjectKind::Table => write!(f, "TABLE"),
            ObjectKind::View => write!(f, "VIEW"),
            ObjectKind::Index => write!(f, "INDEX"),
            ObjectKind::Constraint => write!(f, "CONSTRAINT"),
            ObjectKind::Policy => write!(f, "POLICY"),
            ObjectKind::Function => write!(f, "FUNCTION"),
            ObjectKind::Trigger => write!(f, "TRIGGER"),
            ObjectKind::Comment => write!(f, "COMMENT"),
            ObjectKind::Grant => write!(f, "GRANT"),
        }
    }
}

/// A named object recovered from dump text.
///
/// `parent` holds the owning table for indexes, constraints, policies and
/// triggers. Comments use `parent` for the commented-on object type
/// (`TABLE`, `COLUMN`, ...) and `member` for the column of a column comment.
/// Grants keep the whole
/// `<privilege> ON <object> TO <role>` phrase in `name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatabaseObject {
    pub kind: ObjectKind,
    pub schema: Option<String>,
    pub parent: Option<String>,
    pub name: String,
    #[serde(default)]
    pub member: Option<String>,
    /// Zero-based position among earlier matches with the same key
    pub occurrence: usize,
}

impl DatabaseObject {
    pub fn new(kind: ObjectKind, schema: Option<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            schema,
            parent: None,
            name: name.into(),
            member: None,
            occurrence: 0,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_member(mut self, member: impl Into<String>) -> Self {
        self.member = Some(member.into());
        self
    }

    /// Schema, name and member of a comment target, outermost first
    pub fn path(&self) -> Vec<&str> {
        self.schema
            .as_deref()
            .into_iter()
            .chain(std::iter::once(self.name.as_str()))
            .chain(self.member.as_deref())
            .collect()
    }

    /// Human-readable identifier used in reports and restoration banners
    pub fn identifier(&self) -> String {
        match self.kind {
            ObjectKind::Comment => {
                let target = self.parent.as_deref().unwrap_or("OBJECT");
                format!("{} {}", target, self.path().join("."))
            }
            ObjectKind::Grant => self.name.clone(),
            ObjectKind::Constraint | ObjectKind::Policy | ObjectKind::Trigger => {
                let mut parts: Vec<&str> = Vec::with_capacity(3);
                if let Some(schema) = &self.schema {
                    parts.push(schema);
                }
                if let Some(parent) = &self.parent {
                    parts.push(parent);
                }
                parts.push(&self.name);
                parts.join(".")
            }
            _ => match &self.schema {
                Some(schema) => format!("{}.{}", schema, self.name),
                None => self.name.clone(),
            },
        }
    }
}

impl fmt::Display for DatabaseObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.label(), self.identifier())
    }
}

/// Calculate hash for a DDL statement so reports can flag changed definitions
pub fn calculate_ddl_hash(ddl: &str) -> String {
    let normalized = normalize_ddl_for_hashing(ddl);
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Normalize DDL for consistent hashing across formatting changes
fn normalize_ddl_for_hashing(ddl: &str) -> String {
    ddl.lines()
        .map(|line| line.split("--").next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// SHA-256 of raw bytes, hex encoded
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_formats() {
        let table = DatabaseObject::new(ObjectKind::Table, Some("public".into()), "books");
        assert_eq!(table.identifier(), "public.books");

        let schema = DatabaseObject::new(ObjectKind::Schema, None, "storage");
        assert_eq!(schema.identifier(), "storage");

        let policy = DatabaseObject::new(ObjectKind::Policy, Some("public".into()), "owner can read")
            .with_parent("books");
        assert_eq!(policy.identifier(), "public.books.owner can read");

        let comment = DatabaseObject::new(ObjectKind::Comment, Some("public".into()), "books")
            .with_parent("TABLE");
        assert_eq!(comment.identifier(), "TABLE public.books");

        let column = DatabaseObject::new(ObjectKind::Comment, Some("public".into()), "books")
            .with_parent("COLUMN")
            .with_member("title");
        assert_eq!(column.identifier(), "COLUMN public.books.title");
    }

    #[test]
    fn test_plural_heading_round_trip() {
        for kind in ObjectKind::ALL {
            assert_eq!(ObjectKind::from_plural_heading(kind.plural_heading()), Some(kind));
        }
        assert_eq!(ObjectKind::from_plural_heading("relationships"), None);
    }

    #[test]
    fn test_ddl_hash_ignores_formatting() {
        let a = "CREATE TABLE IF NOT EXISTS \"public\".\"books\" (\n  \"id\" uuid -- key\n);";
        let b = "create table if not exists \"public\".\"books\" (\n\"id\" uuid\n);";
        assert_eq!(calculate_ddl_hash(a), calculate_ddl_hash(b));
        assert_ne!(calculate_ddl_hash(a), calculate_ddl_hash("CREATE TABLE x ();"));
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
