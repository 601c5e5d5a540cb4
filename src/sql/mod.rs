pub mod objects;
pub mod extractor;
pub mod lexer;
pub mod locator;
pub mod structure;

pub use objects::{calculate_ddl_hash, sha256_hex, DatabaseObject, ObjectKind};
pub use extractor::{extract_kind, extract_objects, ExtractedObjects};
pub use locator::{anchor_pattern, locate, locate_all, LocatedObject, Statement, StatementBoundary};
pub use structure::{foreign_keys, table_columns, Column, ForeignKey};
