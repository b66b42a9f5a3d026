//! Integration tests for DDL extraction feeding the checker

use pretty_assertions::assert_eq;
use schemalint_core::{Location, ObjectKind, ViolationCode};
use schemalint_engine::{CheckOptions, Checker, RuleTable};
use schemalint_sql::SqlParser;
use std::path::Path;

const FIXTURE: &str = "../../fixtures/sample-schema/schema.sql";

#[test]
fn extract_fixture_schema() {
    let extraction = SqlParser::new().extract_file(Path::new(FIXTURE)).unwrap();

    assert!(extraction.errors.is_empty(), "{:?}", extraction.errors);

    let declared: Vec<_> = extraction
        .objects
        .iter()
        .map(|o| (o.kind.unwrap(), o.local_name().to_string()))
        .collect();

    assert_eq!(
        declared,
        vec![
            (ObjectKind::Enum, "enum_order_status".to_string()),
            (ObjectKind::Table, "tb_customers".to_string()),
            (ObjectKind::PrimaryKey, "pk_customers".to_string()),
            (ObjectKind::UniqueConstraint, "uq_customers_email".to_string()),
            (ObjectKind::Table, "orders".to_string()),
            (ObjectKind::PrimaryKey, "pk_orders".to_string()),
            (ObjectKind::ForeignKey, "orders_customer_fkey".to_string()),
            (ObjectKind::Index, "idx_orders_customer".to_string()),
            (ObjectKind::View, "vw_open_orders".to_string()),
            (ObjectKind::Function, "fn_touch_updated_at".to_string()),
            (ObjectKind::Trigger, "customers_touch".to_string()),
        ]
    );

    let customers = &extraction.objects[1];
    assert_eq!(customers.fields.len(), 4);
    assert_eq!(customers.comment.as_deref(), Some("One row per customer account"));
    assert_eq!(customers.location, Some(Location::with_line(FIXTURE, 5)));
    assert_eq!(extraction.objects[4].location, Some(Location::with_line(FIXTURE, 14)));
}

#[test]
fn check_fixture_schema() {
    let extraction = SqlParser::new().extract_file(Path::new(FIXTURE)).unwrap();

    let rules = RuleTable::builtin().unwrap();
    let checker = Checker::new(&rules, CheckOptions::default());

    let found: Vec<_> = checker
        .check_all(&extraction.objects)
        .into_iter()
        .flat_map(|outcome| outcome.into_violations())
        .map(|v| (v.code, v.subject()))
        .collect();

    assert_eq!(
        found,
        vec![
            (ViolationCode::ObjectPrefixMissing, "orders".to_string()),
            (ViolationCode::FieldSuffixMissing, "orders.total".to_string()),
            (ViolationCode::FieldSuffixTypeMismatch, "orders.discount_amt".to_string()),
            (ViolationCode::ObjectPrefixMissing, "orders_customer_fkey".to_string()),
            (ViolationCode::ObjectPrefixMissing, "customers_touch".to_string()),
        ]
    );
}

#[test]
fn broken_statement_does_not_hide_the_rest() {
    let sql = "CREATE TABLE tb_a (id BIGINT);\nCREATE VIEW AS SELECT 1;\nCREATE TABLE b (id BIGINT);\n";
    let extraction = SqlParser::new().extract(sql, Some(Path::new("broken.sql"))).unwrap();

    assert_eq!(extraction.objects.len(), 2);
    assert_eq!(extraction.errors.len(), 1);
    assert_eq!(extraction.errors[0].code, ViolationCode::SqlParseError);
    assert_eq!(extraction.errors[0].location, Some(Location::with_line("broken.sql", 2)));

    let rules = RuleTable::builtin().unwrap();
    let checker = Checker::new(&rules, CheckOptions::default());
    let violations = checker.check(&extraction.objects[1]).unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].code, ViolationCode::ObjectPrefixMissing);
    assert_eq!(violations[0].location, Some(Location::with_line("broken.sql", 3)));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = SqlParser::new()
        .extract_file(Path::new("../../fixtures/does-not-exist.sql"))
        .unwrap_err();
    assert!(err.to_string().contains("does-not-exist.sql"));
}
