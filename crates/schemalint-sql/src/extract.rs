//! DDL extraction
//!
//! Turns parsed DDL into [`SchemaObject`] descriptors for the checker:
//! tables with their columns, named constraints, views, indexes,
//! functions, triggers, enum types and policies. `COMMENT ON` statements
//! are attached to the objects they describe.

use crate::parser::{keyword_is, ExtractError, ParsedSql, SqlParser, StatementBody};
use schemalint_core::schema::local_name;
use schemalint_core::{
    Field, Location, ObjectKind, SchemaObject, Severity, Violation, ViolationCode,
};
use sqlparser::ast::{
    AlterTableOperation, ColumnOption, ObjectName, Statement, TableConstraint,
};
use sqlparser::tokenizer::Token;
use std::path::Path;

/// Objects found in a script, plus one violation per unparseable statement
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Declared objects in script order
    pub objects: Vec<SchemaObject>,

    /// `SQL_PARSE_ERROR` violations
    pub errors: Vec<Violation>,
}

impl Extraction {
    /// Number of fields across all objects
    pub fn field_count(&self) -> usize {
        self.objects.iter().map(|o| o.fields.len()).sum()
    }
}

impl SqlParser {
    /// Parse and extract in one step
    pub fn extract(&self, sql: &str, file_path: Option<&Path>) -> Result<Extraction, ExtractError> {
        Ok(extract_objects(&self.parse(sql, file_path)?))
    }

    /// Read, parse and extract a file
    pub fn extract_file(&self, path: &Path) -> Result<Extraction, ExtractError> {
        Ok(extract_objects(&self.parse_file(path)?))
    }
}

/// What a `COMMENT ON` statement targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommentTarget {
    Object(ObjectKind),
    Column,
}

#[derive(Debug, Clone)]
struct PendingComment {
    target: CommentTarget,
    name: Vec<String>,
    text: Option<String>,
}

/// Extract schema objects from a parsed script
///
/// Objects are located at the line of the statement that declares them.
pub fn extract_objects(parsed: &ParsedSql) -> Extraction {
    let file = parsed.file_display();
    let mut extraction = Extraction::default();
    let mut comments = Vec::new();

    for statement in &parsed.statements {
        let location = file
            .as_ref()
            .map(|file| Location::with_line(file.clone(), statement.line));

        let found = match &statement.body {
            StatementBody::Parsed(ast) => from_statement(ast),
            StatementBody::Header(tokens) => {
                if let Some(comment) = comment_from_tokens(tokens) {
                    comments.push(comment);
                }
                object_from_tokens(tokens).into_iter().collect()
            }
            StatementBody::Failed { message, declares_object } => {
                // Unparsed DDL may hide objects; anything else only costs coverage
                let severity = if *declares_object {
                    ViolationCode::SqlParseError.default_severity()
                } else {
                    Severity::Warn
                };

                extraction.errors.push(
                    Violation::new(
                        ViolationCode::SqlParseError,
                        format!("statement #{}", statement.index),
                        format!("Failed to parse SQL: {}", message),
                    )
                    .with_severity(severity)
                    .with_location(Some(
                        location
                            .clone()
                            .unwrap_or_else(|| Location::with_line("<input>", statement.line)),
                    )),
                );
                Vec::new()
            }
        };

        for mut object in found {
            object.location = location.clone();
            extraction.objects.push(object);
        }
    }

    for comment in comments {
        attach_comment(&mut extraction.objects, comment);
    }

    tracing::debug!(
        objects = extraction.objects.len(),
        errors = extraction.errors.len(),
        file = file.as_deref().unwrap_or("<input>"),
        "extracted schema objects"
    );

    extraction
}

/// Objects declared by a parsed statement
fn from_statement(statement: &Statement) -> Vec<SchemaObject> {
    match statement {
        Statement::CreateTable(create) => {
            let mut objects = Vec::new();

            let fields = create
                .columns
                .iter()
                .map(|column| Field::new(column.name.value.clone(), column.data_type.to_string()))
                .collect();
            objects.push(SchemaObject::new(object_name(&create.name), ObjectKind::Table).with_fields(fields));

            for column in &create.columns {
                for option in &column.options {
                    let Some(name) = &option.name else { continue };
                    let kind = match &option.option {
                        ColumnOption::Unique { is_primary: true, .. } => ObjectKind::PrimaryKey,
                        ColumnOption::Unique { is_primary: false, .. } => ObjectKind::UniqueConstraint,
                        ColumnOption::ForeignKey { .. } => ObjectKind::ForeignKey,
                        _ => continue,
                    };
                    objects.push(SchemaObject::new(name.to_string(), kind));
                }
            }

            objects.extend(create.constraints.iter().filter_map(constraint_object));
            objects
        }
        Statement::CreateView { name, materialized, .. } => {
            let kind = if *materialized {
                ObjectKind::MaterializedView
            } else {
                ObjectKind::View
            };
            vec![SchemaObject::new(object_name(name), kind)]
        }
        Statement::CreateIndex(index) => match &index.name {
            Some(name) => vec![SchemaObject::new(object_name(name), ObjectKind::Index)],
            None => {
                tracing::trace!(table = %index.table_name, "unnamed index ignored");
                Vec::new()
            }
        },
        Statement::AlterTable { operations, .. } => operations
            .iter()
            .filter_map(|op| match op {
                AlterTableOperation::AddConstraint(constraint) => constraint_object(constraint),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Named table constraint; unnamed ones get a database-generated name
fn constraint_object(constraint: &TableConstraint) -> Option<SchemaObject> {
    let (name, kind) = match constraint {
        TableConstraint::PrimaryKey { name, .. } => (name, ObjectKind::PrimaryKey),
        TableConstraint::ForeignKey { name, .. } => (name, ObjectKind::ForeignKey),
        TableConstraint::Unique { name, .. } => (name, ObjectKind::UniqueConstraint),
        _ => return None,
    };

    name.as_ref().map(|ident| SchemaObject::new(ident.to_string(), kind))
}

fn object_name(name: &ObjectName) -> String {
    name.to_string()
}

/// `CREATE [OR REPLACE] [CONSTRAINT] TRIGGER|FUNCTION|TYPE .. AS ENUM|POLICY name`
fn object_from_tokens(tokens: &[Token]) -> Option<SchemaObject> {
    if !tokens.first().is_some_and(|t| keyword_is(t, "CREATE")) {
        return None;
    }

    let mut i = 1;
    if tokens.get(i).is_some_and(|t| keyword_is(t, "OR"))
        && tokens.get(i + 1).is_some_and(|t| keyword_is(t, "REPLACE"))
    {
        i += 2;
    }
    if tokens.get(i).is_some_and(|t| keyword_is(t, "CONSTRAINT")) {
        i += 1;
    }

    let keyword = tokens.get(i)?;
    let (parts, next) = read_name(tokens, i + 1)?;
    let name = parts.join(".");

    let kind = if keyword_is(keyword, "TRIGGER") {
        ObjectKind::Trigger
    } else if keyword_is(keyword, "FUNCTION") {
        ObjectKind::Function
    } else if keyword_is(keyword, "POLICY") {
        ObjectKind::Policy
    } else if keyword_is(keyword, "TYPE") {
        let is_enum = tokens.get(next).is_some_and(|t| keyword_is(t, "AS"))
            && tokens.get(next + 1).is_some_and(|t| keyword_is(t, "ENUM"));
        if !is_enum {
            return None;
        }
        ObjectKind::Enum
    } else {
        return None;
    };

    Some(SchemaObject::new(name, kind))
}

/// `COMMENT ON <target> name IS 'text' | NULL`
fn comment_from_tokens(tokens: &[Token]) -> Option<PendingComment> {
    if !(tokens.first().is_some_and(|t| keyword_is(t, "COMMENT"))
        && tokens.get(1).is_some_and(|t| keyword_is(t, "ON")))
    {
        return None;
    }

    let (target, name_start) = match tokens.get(2)? {
        t if keyword_is(t, "TABLE") => (CommentTarget::Object(ObjectKind::Table), 3),
        t if keyword_is(t, "VIEW") => (CommentTarget::Object(ObjectKind::View), 3),
        t if keyword_is(t, "FUNCTION") => (CommentTarget::Object(ObjectKind::Function), 3),
        t if keyword_is(t, "TYPE") => (CommentTarget::Object(ObjectKind::Enum), 3),
        t if keyword_is(t, "COLUMN") => (CommentTarget::Column, 3),
        t if keyword_is(t, "MATERIALIZED") && tokens.get(3).is_some_and(|t| keyword_is(t, "VIEW")) => {
            (CommentTarget::Object(ObjectKind::MaterializedView), 4)
        }
        _ => return None,
    };

    let (name, after_name) = read_name(tokens, name_start)?;
    if target == CommentTarget::Column && name.len() < 2 {
        return None;
    }

    // Function signatures sit between the name and IS
    let is_at = (after_name..tokens.len()).find(|&i| keyword_is(&tokens[i], "IS"))?;

    let text = match tokens.get(is_at + 1)? {
        Token::SingleQuotedString(s) | Token::EscapedStringLiteral(s) => Some(s.clone()),
        Token::DollarQuotedString(d) => Some(d.value.clone()),
        t if keyword_is(t, "NULL") => None,
        _ => return None,
    };

    Some(PendingComment { target, name, text })
}

/// Dotted identifier starting at `start`; returns its parts and the next index
fn read_name(tokens: &[Token], start: usize) -> Option<(Vec<String>, usize)> {
    let mut parts = Vec::new();
    let mut i = start;

    while let Some(Token::Word(word)) = tokens.get(i) {
        parts.push(word.to_string());
        i += 1;

        if matches!(tokens.get(i), Some(Token::Period)) {
            i += 1;
        } else {
            break;
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some((parts, i))
    }
}

/// Attach a comment to the most recent matching declaration
fn attach_comment(objects: &mut [SchemaObject], comment: PendingComment) {
    match comment.target {
        CommentTarget::Object(kind) => {
            let target = local_name(&comment.name.join(".")).to_string();
            let found = objects
                .iter_mut()
                .rev()
                .find(|o| o.kind == Some(kind) && o.local_name() == target);

            match found {
                Some(object) => object.comment = comment.text,
                None => tracing::debug!(%kind, name = %target, "comment for undeclared object"),
            }
        }
        CommentTarget::Column => {
            let (column, relation) = match comment.name.split_last() {
                Some((column, relation)) => (local_name(column).to_string(), relation.join(".")),
                None => return,
            };
            let relation = local_name(&relation).to_string();

            let field = objects
                .iter_mut()
                .rev()
                .filter(|o| {
                    matches!(
                        o.kind,
                        Some(ObjectKind::Table | ObjectKind::View | ObjectKind::MaterializedView)
                    ) && o.local_name() == relation
                })
                .find_map(|o| o.find_field_mut(&column));

            match field {
                Some(field) => field.comment = comment.text,
                None => tracing::debug!(relation = %relation, column = %column, "comment for undeclared column"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(sql: &str) -> Extraction {
        let parsed = SqlParser::new().parse(sql, Some(Path::new("schema.sql"))).unwrap();
        extract_objects(&parsed)
    }

    fn summary(extraction: &Extraction) -> Vec<(ObjectKind, String)> {
        extraction
            .objects
            .iter()
            .map(|o| (o.kind.unwrap(), o.name.clone()))
            .collect()
    }

    #[test]
    fn create_table_with_constraints() {
        let extraction = extract(
            r#"
            CREATE TABLE public.tb_orders (
                id BIGINT GENERATED ALWAYS AS IDENTITY,
                customer_id BIGINT CONSTRAINT fk_orders_customer REFERENCES tb_customers (id),
                total_amt NUMERIC(12, 2) NOT NULL,
                placed_ts TIMESTAMPTZ NOT NULL DEFAULT now(),
                CONSTRAINT pk_orders PRIMARY KEY (id),
                CONSTRAINT uq_orders_ref UNIQUE (customer_id, placed_ts),
                UNIQUE (total_amt)
            );
            "#,
        );

        assert_eq!(
            summary(&extraction),
            vec![
                (ObjectKind::Table, "public.tb_orders".to_string()),
                (ObjectKind::ForeignKey, "fk_orders_customer".to_string()),
                (ObjectKind::PrimaryKey, "pk_orders".to_string()),
                (ObjectKind::UniqueConstraint, "uq_orders_ref".to_string()),
            ]
        );

        let table = &extraction.objects[0];
        let fields: Vec<_> = table.fields.iter().map(|f| (f.name.as_str(), f.family())).collect();
        assert_eq!(
            fields,
            vec![
                ("id", schemalint_core::TypeFamily::Integer),
                ("customer_id", schemalint_core::TypeFamily::Integer),
                ("total_amt", schemalint_core::TypeFamily::Decimal),
                ("placed_ts", schemalint_core::TypeFamily::TimestampTz),
            ]
        );
        assert_eq!(table.location, Some(Location::with_line("schema.sql", 2)));
    }

    #[test]
    fn views_indexes_and_alter_table() {
        let extraction = extract(
            r#"
            CREATE VIEW vw_active_users AS SELECT id FROM tb_users;
            CREATE MATERIALIZED VIEW mv_daily_sales AS SELECT 1 AS one;
            CREATE UNIQUE INDEX idx_users_email ON tb_users (email);
            CREATE INDEX ON tb_users (name);
            ALTER TABLE tb_orders ADD CONSTRAINT orders_user_fkey FOREIGN KEY (user_id) REFERENCES tb_users (id);
            "#,
        );

        assert_eq!(
            summary(&extraction),
            vec![
                (ObjectKind::View, "vw_active_users".to_string()),
                (ObjectKind::MaterializedView, "mv_daily_sales".to_string()),
                (ObjectKind::Index, "idx_users_email".to_string()),
                (ObjectKind::ForeignKey, "orders_user_fkey".to_string()),
            ]
        );
    }

    #[test]
    fn header_declarations() {
        let extraction = extract(
            r#"
            CREATE TYPE enum_order_status AS ENUM ('open', 'paid');
            CREATE TYPE address AS (street TEXT, city TEXT);
            CREATE OR REPLACE FUNCTION app.fn_touch_updated_at() RETURNS trigger
                LANGUAGE plpgsql AS $$ BEGIN NEW.updated_at := now(); RETURN NEW; END; $$;
            CREATE CONSTRAINT TRIGGER users_touch AFTER UPDATE ON tb_users
                FOR EACH ROW EXECUTE FUNCTION app.fn_touch_updated_at();
            CREATE POLICY pol_users_owner ON tb_users USING (id = current_setting('app.user_id')::bigint);
            "#,
        );

        assert_eq!(
            summary(&extraction),
            vec![
                (ObjectKind::Enum, "enum_order_status".to_string()),
                (ObjectKind::Function, "app.fn_touch_updated_at".to_string()),
                (ObjectKind::Trigger, "users_touch".to_string()),
                (ObjectKind::Policy, "pol_users_owner".to_string()),
            ]
        );
        assert!(extraction.errors.is_empty());
    }

    #[test]
    fn comments_are_attached() {
        let extraction = extract(
            r#"
            CREATE TABLE tb_users (id BIGINT, email TEXT);
            CREATE FUNCTION fn_now() RETURNS timestamptz LANGUAGE sql AS 'SELECT now()';
            COMMENT ON TABLE public.tb_users IS 'Registered users, one row per account';
            COMMENT ON COLUMN tb_users.email IS 'Login address';
            COMMENT ON FUNCTION fn_now() IS $$Current time$$;
            COMMENT ON TABLE tb_missing IS 'ignored';
            "#,
        );

        let users = &extraction.objects[0];
        assert_eq!(users.comment.as_deref(), Some("Registered users, one row per account"));
        assert_eq!(users.find_field("email").unwrap().comment.as_deref(), Some("Login address"));
        assert_eq!(extraction.objects[1].comment.as_deref(), Some("Current time"));
    }

    #[test]
    fn comment_null_clears() {
        let extraction = extract(
            r#"
            CREATE VIEW vw_users AS SELECT 1 AS id;
            COMMENT ON VIEW vw_users IS 'temporary';
            COMMENT ON VIEW vw_users IS NULL;
            "#,
        );
        assert_eq!(extraction.objects[0].comment, None);
    }

    #[test]
    fn parse_errors_become_violations() {
        let extraction = extract("CREATE TABLE tb_a (id BIGINT);\nCREATE TABLE (;\nCREATE TABLE tb_b (id BIGINT);");

        assert_eq!(extraction.objects.len(), 2);
        assert_eq!(extraction.errors.len(), 1);

        let error = &extraction.errors[0];
        assert_eq!(error.code, ViolationCode::SqlParseError);
        assert_eq!(error.object_name, "statement #2");
        assert_eq!(error.location, Some(Location::with_line("schema.sql", 2)));
        assert_eq!(extraction.objects[1].location, Some(Location::with_line("schema.sql", 3)));
        assert_eq!(error.severity, Severity::Error);
    }

    #[test]
    fn unparsed_non_ddl_is_a_warning() {
        let extraction = extract(
            "DO $$ BEGIN RAISE NOTICE 'migrating'; END $$;\nCREATE TABLE tb_a (id BIGINT);",
        );

        assert_eq!(extraction.objects.len(), 1);
        assert_eq!(extraction.errors.len(), 1);
        assert_eq!(extraction.errors[0].code, ViolationCode::SqlParseError);
        assert_eq!(extraction.errors[0].severity, Severity::Warn);
        assert!(extraction.errors[0].is_advisory());
    }
}
