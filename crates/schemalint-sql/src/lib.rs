//! DDL extraction
//!
//! This crate handles:
//! - Splitting SQL scripts into statements using datafusion-sqlparser-rs
//! - Extracting declared objects (tables, views, indexes, constraints,
//!   functions, triggers, enum types, policies) as schema descriptors
//! - Attaching `COMMENT ON` text to the objects and columns it describes
//! - Reporting unparseable statements as violations with their line

pub mod parser;
pub mod extract;

pub use parser::{SqlParser, ParsedSql, SqlStatement, StatementBody, ExtractError};
pub use extract::{Extraction, extract_objects};
