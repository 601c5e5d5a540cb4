//! Regex extraction of named objects from dump text.
//!
//! Each object kind has exactly one pattern. The patterns assume the dump
//! quotes every identifier with double quotes and uses the keyword casing of
//! `supabase db dump` / `pg_dump`; text in any other shape yields no matches
//! for that kind rather than an error.

use std::collections::{BTreeMap, HashMap};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;
use crate::sql::objects::{DatabaseObject, ObjectKind};

static SCHEMA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"CREATE SCHEMA IF NOT EXISTS "([^"]+)""#).unwrap());

static EXTENSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"CREATE EXTENSION IF NOT EXISTS "([^"]+)""#).unwrap());

static TYPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"CREATE TYPE "([^"]+)"\."([^"]+)" AS"#).unwrap());

static SEQUENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"CREATE SEQUENCE (?:IF NOT EXISTS )?"([^"]+)"\."([^"]+)""#).unwrap()
});

static TABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"CREATE TABLE IF NOT EXISTS "([^"]+)"\."([^"]+)""#).unwrap());

static VIEW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"CREATE (?:OR REPLACE )?VIEW "([^"]+)"\."([^"]+)""#).unwrap());

static INDEX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"CREATE (?:UNIQUE )?INDEX (?:IF NOT EXISTS )?"([^"]+)" ON (?:ONLY )?"([^"]+)"\."([^"]+)""#,
    )
    .unwrap()
});

static CONSTRAINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"ALTER TABLE (?:ONLY )?"([^"]+)"\."([^"]+)"\s+ADD CONSTRAINT "([^"]+)""#).unwrap()
});

static POLICY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"CREATE POLICY "([^"]+)" ON "([^"]+)"\."([^"]+)""#).unwrap());

static FUNCTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"CREATE OR REPLACE FUNCTION "([^"]+)"\."([^"]+)"\("#).unwrap()
});

static TRIGGER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"CREATE (?:OR REPLACE )?(?:CONSTRAINT )?TRIGGER "([^"]+)"[^;]*?\bON "([^"]+)"\."([^"]+)""#,
    )
    .unwrap()
});

static COMMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"COMMENT ON (SCHEMA|TABLE|VIEW|COLUMN|FUNCTION|TYPE|SEQUENCE|INDEX) "([^"]+)"(?:\."([^"]+)")?(?:\."([^"]+)")?"#,
    )
    .unwrap()
});

// must open a line, so the GRANT clause of ALTER DEFAULT PRIVILEGES is skipped
static GRANT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^GRANT\s+([^;]+?)\s+ON\s+([^;]+?)\s+TO\s+([^;]+?)\s*;"#).unwrap()
});

/// Objects recovered from one dump, grouped by kind in match order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedObjects {
    objects: BTreeMap<ObjectKind, Vec<DatabaseObject>>,
}

impl ExtractedObjects {
    /// Objects of one kind, in the order they appear in the dump
    pub fn get(&self, kind: ObjectKind) -> &[DatabaseObject] {
        self.objects.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Report identifiers for one kind, in dump order
    pub fn identifiers(&self, kind: ObjectKind) -> Vec<String> {
        self.get(kind).iter().map(DatabaseObject::identifier).collect()
    }

    /// Number of matches per kind; every kind is present, possibly with 0
    pub fn counts(&self) -> BTreeMap<ObjectKind, usize> {
        ObjectKind::ALL
            .iter()
            .map(|kind| (*kind, self.get(*kind).len()))
            .collect()
    }

    pub fn total(&self) -> usize {
        self.objects.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// All objects, kinds in `ObjectKind::ALL` order
    pub fn iter(&self) -> impl Iterator<Item = &DatabaseObject> {
        ObjectKind::ALL.iter().flat_map(move |kind| self.get(*kind).iter())
    }

    /// Matches that repeat an earlier `(kind, schema, parent, name)` key.
    ///
    /// Function overloads show up here as well as genuine duplicates.
    pub fn repeated(&self) -> Vec<&DatabaseObject> {
        self.iter().filter(|object| object.occurrence > 0).collect()
    }

    /// Keep only the objects accepted by `keep`
    pub fn retain(&mut self, mut keep: impl FnMut(&DatabaseObject) -> bool) {
        for objects in self.objects.values_mut() {
            objects.retain(|object| keep(object));
        }
    }
}

/// Extract every recognised object from `dump`
pub fn extract_objects(dump: &str) -> ExtractedObjects {
    let mut objects = BTreeMap::new();

    for kind in ObjectKind::ALL {
        let mut found = extract_kind(dump, kind);
        assign_occurrences(&mut found);
        debug!("Extracted {} {} object(s)", found.len(), kind.label());
        objects.insert(kind, found);
    }

    ExtractedObjects { objects }
}

/// Extract objects of a single kind, in match order
pub fn extract_kind(dump: &str, kind: ObjectKind) -> Vec<DatabaseObject> {
    let regex: &Regex = match kind {
        ObjectKind::Schema => &SCHEMA_RE,
        ObjectKind::Extension => &EXTENSION_RE,
        ObjectKind::Type => &TYPE_RE,
        ObjectKind::Sequence => &SEQUENCE_RE,
        ObjectKind::Table => &TABLE_RE,
        ObjectKind::View => &VIEW_RE,
        ObjectKind::Index => &INDEX_RE,
        ObjectKind::Constraint => &CONSTRAINT_RE,
        ObjectKind::Policy => &POLICY_RE,
        ObjectKind::Function => &FUNCTION_RE,
        ObjectKind::Trigger => &TRIGGER_RE,
        ObjectKind::Comment => &COMMENT_RE,
        ObjectKind::Grant => &GRANT_RE,
    };

    regex
        .captures_iter(dump)
        .map(|caps| object_from_captures(kind, &caps))
        .collect()
}

fn object_from_captures(kind: ObjectKind, caps: &Captures<'_>) -> DatabaseObject {
    let group = |i: usize| caps.get(i).map(|m| m.as_str().to_string());
    let required = |i: usize| group(i).unwrap_or_default();

    match kind {
        ObjectKind::Schema | ObjectKind::Extension => DatabaseObject::new(kind, None, required(1)),
        ObjectKind::Type
        | ObjectKind::Sequence
        | ObjectKind::Table
        | ObjectKind::View
        | ObjectKind::Function => DatabaseObject::new(kind, group(1), required(2)),
        ObjectKind::Index | ObjectKind::Trigger => {
            DatabaseObject::new(kind, group(2), required(1)).with_parent(required(3))
        }
        ObjectKind::Constraint => {
            DatabaseObject::new(kind, group(1), required(3)).with_parent(required(2))
        }
        ObjectKind::Policy => {
            DatabaseObject::new(kind, group(2), required(1)).with_parent(required(3))
        }
        ObjectKind::Comment => {
            let target = required(1);
            let object = match (group(3), group(4)) {
                (None, _) => DatabaseObject::new(kind, None, required(2)),
                (Some(name), None) => DatabaseObject::new(kind, group(2), name),
                (Some(name), Some(member)) => {
                    DatabaseObject::new(kind, group(2), name).with_member(member)
                }
            };
            object.with_parent(target)
        }
        ObjectKind::Grant => {
            let phrase = format!(
                "{} ON {} TO {}",
                collapse_whitespace(&required(1)),
                collapse_whitespace(&required(2)),
                collapse_whitespace(&required(3)),
            );
            DatabaseObject::new(kind, None, phrase)
        }
    }
}

fn assign_occurrences(objects: &mut [DatabaseObject]) {
    type Key = (Option<String>, Option<String>, String, Option<String>);
    let mut seen: HashMap<Key, usize> = HashMap::new();
    for object in objects.iter_mut() {
        let key = (
            object.schema.clone(),
            object.parent.clone(),
            object.name.clone(),
            object.member.clone(),
        );
        let count = seen.entry(key).or_insert(0);
        object.occurrence = *count;
        *count += 1;
    }
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_books_table() {
        let dump = r#"CREATE TABLE IF NOT EXISTS "public"."books" ("id" uuid, "title" text);"#;
        let extracted = extract_objects(dump);

        assert_eq!(extracted.identifiers(ObjectKind::Table), vec!["public.books"]);
        assert_eq!(extracted.total(), 1);
    }

    #[test]
    fn test_unquoted_identifiers_yield_nothing() {
        let dump = "CREATE TABLE IF NOT EXISTS public.books (id uuid);\ncreate schema if not exists \"app\";";
        let extracted = extract_objects(dump);

        assert!(extracted.is_empty());
        assert_eq!(extracted.counts()[&ObjectKind::Table], 0);
        assert_eq!(extracted.counts()[&ObjectKind::Schema], 0);
    }

    #[test]
    fn test_constraint_with_only_and_newline() {
        let dump = "ALTER TABLE ONLY \"public\".\"books\"\n    ADD CONSTRAINT \"books_pkey\" PRIMARY KEY (\"id\");";
        let constraints = extract_kind(dump, ObjectKind::Constraint);

        assert_eq!(constraints.len(), 1);
        assert_eq!(constraints[0].identifier(), "public.books.books_pkey");
    }

    #[test]
    fn test_trigger_picks_up_table() {
        let dump = r#"CREATE OR REPLACE TRIGGER "set_updated" BEFORE UPDATE ON "public"."books" FOR EACH ROW EXECUTE FUNCTION "public"."touch"();"#;
        let triggers = extract_kind(dump, ObjectKind::Trigger);

        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].parent.as_deref(), Some("books"));
        assert_eq!(triggers[0].identifier(), "public.books.set_updated");
    }

    #[test]
    fn test_comment_targets() {
        let dump = concat!(
            "COMMENT ON SCHEMA \"public\" IS 'standard public schema';\n",
            "COMMENT ON TABLE \"public\".\"books\" IS 'Books';\n",
            "COMMENT ON COLUMN \"public\".\"books\".\"title\" IS 'Display title';\n",
        );
        let comments = extract_objects(dump).identifiers(ObjectKind::Comment);

        assert_eq!(
            comments,
            vec!["SCHEMA public", "TABLE public.books", "COLUMN public.books.title"]
        );
    }

    #[test]
    fn test_comment_path_keeps_dotted_names_apart() {
        let dump = "COMMENT ON COLUMN \"public\".\"my.table\".\"title\" IS 'Display title';";
        let comments = extract_kind(dump, ObjectKind::Comment);

        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].schema.as_deref(), Some("public"));
        assert_eq!(comments[0].name, "my.table");
        assert_eq!(comments[0].member.as_deref(), Some("title"));
    }

    #[test]
    fn test_grant_phrase_is_normalised() {
        let dump = "GRANT ALL ON TABLE \"public\".\"books\" TO \"anon\";\nGRANT USAGE ON SCHEMA \"public\"\n    TO \"authenticated\";";
        let grants = extract_objects(dump).identifiers(ObjectKind::Grant);

        assert_eq!(
            grants,
            vec![
                "ALL ON TABLE \"public\".\"books\" TO \"anon\"",
                "USAGE ON SCHEMA \"public\" TO \"authenticated\"",
            ]
        );
    }

    #[test]
    fn test_default_privileges_are_not_grants() {
        let dump = concat!(
            "ALTER DEFAULT PRIVILEGES FOR ROLE \"postgres\" IN SCHEMA \"public\" GRANT ALL ON TABLES TO \"anon\";\n",
            "GRANT ALL ON TABLE \"public\".\"books\" TO \"anon\";\n",
        );
        let grants = extract_objects(dump).identifiers(ObjectKind::Grant);

        assert_eq!(grants, vec!["ALL ON TABLE \"public\".\"books\" TO \"anon\""]);
    }

    #[test]
    fn test_repeated_matches_are_kept() {
        let dump = concat!(
            "CREATE OR REPLACE FUNCTION \"public\".\"f\"(\"a\" integer) RETURNS integer AS 'select 1' LANGUAGE sql;\n",
            "CREATE OR REPLACE FUNCTION \"public\".\"f\"(\"a\" text) RETURNS integer AS 'select 2' LANGUAGE sql;\n",
        );
        let extracted = extract_objects(dump);
        let functions = extracted.get(ObjectKind::Function);

        assert_eq!(functions.len(), 2);
        assert_eq!(functions[0].occurrence, 0);
        assert_eq!(functions[1].occurrence, 1);
        assert_eq!(extracted.repeated().len(), 1);
    }
}
