//! Convention checker
//!
//! Validates schema objects against a [`RuleTable`]. A check is a pure
//! function of its input: the checker holds no mutable state, so objects
//! can be checked in any order or in parallel.

use crate::rule_table::RuleTable;
use rayon::prelude::*;
use schemalint_core::{
    AllowlistRules, Config, Field, InputError, Location, ObjectKind, SchemaObject, Severity,
    SeverityThreshold, Violation, ViolationCode,
};

/// Irregular plurals accepted by the plural-name hint
const IRREGULAR_PLURALS: &[&str] = &["people", "children", "data", "media", "criteria", "men", "women"];

/// Rule toggles and per-code severity overrides
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Require lowercase snake_case names
    pub snake_case: bool,

    /// Emit the plural-table-name hint
    pub plural_tables: bool,

    /// Emit a hint for tables, views and functions without a comment
    pub require_comments: bool,

    /// Severity overrides
    pub severity: SeverityThreshold,

    /// Objects to skip entirely
    pub allowlist: AllowlistRules,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            snake_case: true,
            plural_tables: false,
            require_comments: false,
            severity: SeverityThreshold::default(),
            allowlist: AllowlistRules::default(),
        }
    }
}

impl CheckOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            snake_case: config.rules.snake_case,
            plural_tables: config.rules.plural_tables,
            require_comments: config.rules.require_comments,
            severity: config.severity.clone(),
            allowlist: config.allowlist.clone(),
        }
    }
}

/// Result of checking one object in a batch
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    /// Name of the object as given
    pub object_name: String,

    /// Where the object came from
    pub location: Option<Location>,

    /// Violations, or the reason the object could not be checked
    pub result: Result<Vec<Violation>, InputError>,
}

impl CheckOutcome {
    /// Flatten into violations; an input error becomes an `INPUT_MALFORMED` violation
    pub fn into_violations(self) -> Vec<Violation> {
        match self.result {
            Ok(violations) => violations,
            Err(err) => {
                let name = if self.object_name.trim().is_empty() {
                    "<unnamed>".to_string()
                } else {
                    self.object_name
                };
                vec![Violation::new(ViolationCode::InputMalformed, name, err.to_string())
                    .with_location(self.location)]
            }
        }
    }
}

/// Checks schema objects against an injected rule table
#[derive(Debug, Clone)]
pub struct Checker<'a> {
    rules: &'a RuleTable,
    options: CheckOptions,
}

impl<'a> Checker<'a> {
    pub fn new(rules: &'a RuleTable, options: CheckOptions) -> Self {
        Self { rules, options }
    }

    pub fn rules(&self) -> &RuleTable {
        self.rules
    }

    /// Check one object
    ///
    /// Violations come back in rule evaluation order: object name, prefix,
    /// plural hint, comment hint, then each field in declaration order.
    /// A malformed object fails as a whole with no partial output.
    pub fn check(&self, object: &SchemaObject) -> Result<Vec<Violation>, InputError> {
        let kind = object.validate()?;
        let name = object.local_name();

        if self.options.allowlist.is_object_skipped(name)
            || self.options.allowlist.is_object_skipped(&object.name)
        {
            tracing::debug!(object = %object.name, "skipped by allowlist");
            return Ok(Vec::new());
        }

        let mut out = Vec::new();

        if self.options.snake_case && !self.rules.is_snake_case(name) {
            self.emit(
                &mut out,
                object,
                Violation::new(
                    ViolationCode::ObjectNameNotSnakeCase,
                    &object.name,
                    format!("Name of {} '{}' is not lowercase snake_case", kind, name),
                ),
            );
        }

        if let Some(rule) = self.rules.prefix_rule(kind) {
            if !rule.matches(name) {
                self.emit(
                    &mut out,
                    object,
                    Violation::new(
                        ViolationCode::ObjectPrefixMissing,
                        &object.name,
                        format!("Name of {} '{}' must start with '{}'", kind, name, rule.prefix),
                    )
                    .with_comparison(format!("{}*", rule.prefix), name),
                );
            }
        }

        if kind == ObjectKind::Table && self.options.plural_tables {
            let stem = self
                .rules
                .prefix_rule(kind)
                .and_then(|rule| name.strip_prefix(rule.prefix.as_str()))
                .unwrap_or(name);

            if !looks_plural(stem) {
                self.emit(
                    &mut out,
                    object,
                    Violation::new(
                        ViolationCode::TableNameNotPlural,
                        &object.name,
                        format!("Table name '{}' does not look plural", name),
                    ),
                );
            }
        }

        if self.options.require_comments && kind.expects_comment() && !has_text(&object.comment) {
            self.emit(
                &mut out,
                object,
                Violation::new(
                    ViolationCode::ObjectCommentMissing,
                    &object.name,
                    format!("No COMMENT ON describes {} '{}'", kind, name),
                ),
            );
        }

        for field in &object.fields {
            self.check_field(&mut out, object, field);
        }

        tracing::debug!(object = %object.name, %kind, violations = out.len(), "checked");
        Ok(out)
    }

    fn check_field(&self, out: &mut Vec<Violation>, object: &SchemaObject, field: &Field) {
        if self.options.snake_case && !self.rules.is_snake_case(&field.name) {
            self.emit(
                out,
                object,
                Violation::new(
                    ViolationCode::FieldNameNotSnakeCase,
                    &object.name,
                    format!("Field '{}' is not lowercase snake_case", field.name),
                )
                .with_field(&field.name),
            );
        }

        if self.rules.is_exempt(&field.name) {
            return;
        }

        let family = field.family();

        match self.rules.suffix_rule(&field.name) {
            Some(rule) if rule.accepts(family) => {}
            Some(rule) => {
                self.emit(
                    out,
                    object,
                    Violation::new(
                        ViolationCode::FieldSuffixTypeMismatch,
                        &object.name,
                        format!(
                            "Field '{}' ends with '{}', which implies type {}, but is declared {}",
                            field.name,
                            rule.suffix,
                            rule.expected_display(),
                            field.declared_type
                        ),
                    )
                    .with_field(&field.name)
                    .with_comparison(rule.expected_display(), &field.declared_type),
                );
            }
            None => {
                let violation = match self.rules.suggest_suffix(family) {
                    Some(suggestion) => Violation::new(
                        ViolationCode::FieldSuffixMissing,
                        &object.name,
                        format!(
                            "Field '{}' has no semantic suffix; consider '{}{}' ({})",
                            field.name, field.name, suggestion.suffix, suggestion.description
                        ),
                    )
                    .with_comparison(format!("*{}", suggestion.suffix), &field.name),
                    None => Violation::new(
                        ViolationCode::FieldSuffixMissing,
                        &object.name,
                        format!(
                            "Field '{}' has no semantic suffix and no suffix covers type {}",
                            field.name, field.declared_type
                        ),
                    ),
                };
                self.emit(out, object, violation.with_field(&field.name));
            }
        }
    }

    fn emit(&self, out: &mut Vec<Violation>, object: &SchemaObject, violation: Violation) {
        let severity: Severity = self
            .options
            .severity
            .get_severity(violation.code, violation.severity);

        out.push(
            violation
                .with_severity(severity)
                .with_location(object.location.clone()),
        );
    }

    /// Check a batch of objects in parallel, preserving input order
    ///
    /// An input error only fails its own object.
    pub fn check_all(&self, objects: &[SchemaObject]) -> Vec<CheckOutcome> {
        objects
            .par_iter()
            .map(|object| {
                let result = self.check(object);
                if let Err(err) = &result {
                    tracing::warn!(object = %object.name, error = %err, "object rejected");
                }
                CheckOutcome {
                    object_name: object.name.clone(),
                    location: object.location.clone(),
                    result,
                }
            })
            .collect()
    }
}

fn has_text(comment: &Option<String>) -> bool {
    comment.as_deref().is_some_and(|c| !c.trim().is_empty())
}

/// Advisory heuristic on the last word of a table name
fn looks_plural(stem: &str) -> bool {
    let last = stem.rsplit('_').next().unwrap_or(stem);
    if IRREGULAR_PLURALS.contains(&last) {
        return true;
    }
    last.ends_with('s') && !last.ends_with("ss")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RuleTable {
        RuleTable::builtin().unwrap()
    }

    #[test]
    fn compliant_table() {
        let rules = table();
        let checker = Checker::new(&rules, CheckOptions::default());

        let object = SchemaObject::new("tb_users", ObjectKind::Table);
        assert_eq!(checker.check(&object).unwrap(), Vec::new());
    }

    #[test]
    fn missing_prefix() {
        let rules = table();
        let checker = Checker::new(&rules, CheckOptions::default());

        let violations = checker.check(&SchemaObject::new("user_table", ObjectKind::Table)).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, ViolationCode::ObjectPrefixMissing);
        assert_eq!(violations[0].severity, Severity::Error);
        assert!(violations[0].message.contains("tb_"));
    }

    #[test]
    fn missing_kind_fails_fast() {
        let rules = table();
        let checker = Checker::new(&rules, CheckOptions::default());

        let mut object = SchemaObject::new("UserTable", ObjectKind::Table)
            .with_fields(vec![Field::new("total", "decimal")]);
        object.kind = None;

        let err = checker.check(&object).unwrap_err();
        assert_eq!(err, InputError::MissingKind { object: "UserTable".to_string() });
    }

    #[test]
    fn plural_hint_is_opt_in() {
        let rules = table();
        let object = SchemaObject::new("tb_user", ObjectKind::Table);

        let checker = Checker::new(&rules, CheckOptions::default());
        assert!(checker.check(&object).unwrap().is_empty());

        let options = CheckOptions { plural_tables: true, ..CheckOptions::default() };
        let checker = Checker::new(&rules, options);
        let violations = checker.check(&object).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, ViolationCode::TableNameNotPlural);
        assert!(violations[0].is_advisory());

        assert!(checker.check(&SchemaObject::new("tb_order_items", ObjectKind::Table)).unwrap().is_empty());
        assert!(checker.check(&SchemaObject::new("tb_people", ObjectKind::Table)).unwrap().is_empty());
    }

    #[test]
    fn comment_hint_is_opt_in() {
        let rules = table();
        let options = CheckOptions { require_comments: true, ..CheckOptions::default() };
        let checker = Checker::new(&rules, options);

        let violations = checker.check(&SchemaObject::new("vw_active_users", ObjectKind::View)).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, ViolationCode::ObjectCommentMissing);

        let commented = SchemaObject::new("vw_active_users", ObjectKind::View).with_comment("Users seen in 30 days");
        assert!(checker.check(&commented).unwrap().is_empty());

        // Indexes are not expected to carry comments
        assert!(checker.check(&SchemaObject::new("idx_users_email", ObjectKind::Index)).unwrap().is_empty());
    }

    #[test]
    fn snake_case_findings() {
        let rules = table();
        let checker = Checker::new(&rules, CheckOptions::default());

        let object = SchemaObject::new("tb_Users", ObjectKind::Table)
            .with_fields(vec![Field::new("createdTs", "timestamptz")]);
        let codes: Vec<_> = checker.check(&object).unwrap().iter().map(|v| v.code).collect();
        assert_eq!(
            codes,
            vec![
                ViolationCode::ObjectNameNotSnakeCase,
                ViolationCode::FieldNameNotSnakeCase,
                ViolationCode::FieldSuffixMissing,
            ]
        );

        let options = CheckOptions { snake_case: false, ..CheckOptions::default() };
        let checker = Checker::new(&rules, options);
        let codes: Vec<_> = checker.check(&object).unwrap().iter().map(|v| v.code).collect();
        assert_eq!(codes, vec![ViolationCode::FieldSuffixMissing]);
    }

    #[test]
    fn severity_overrides_apply() {
        let rules = table();
        let mut options = CheckOptions::default();
        options.severity.set_override(ViolationCode::ObjectPrefixMissing, Severity::Warn);
        let checker = Checker::new(&rules, options);

        let violations = checker.check(&SchemaObject::new("users", ObjectKind::Table)).unwrap();
        assert_eq!(violations[0].severity, Severity::Warn);
    }

    #[test]
    fn allowlisted_objects_are_skipped() {
        let rules = table();
        let mut options = CheckOptions::default();
        options.allowlist.skip_objects.push("schema_migrations".to_string());
        let checker = Checker::new(&rules, options);

        let object = SchemaObject::new("public.schema_migrations", ObjectKind::Table)
            .with_fields(vec![Field::new("version", "bigint")]);
        assert!(checker.check(&object).unwrap().is_empty());
    }

    #[test]
    fn qualified_names_use_local_part() {
        let rules = table();
        let checker = Checker::new(&rules, CheckOptions::default());

        assert!(checker.check(&SchemaObject::new("public.tb_users", ObjectKind::Table)).unwrap().is_empty());
        assert!(checker.check(&SchemaObject::new("\"app\".\"vw_users\"", ObjectKind::View)).unwrap().is_empty());
    }

    #[test]
    fn location_is_carried() {
        let rules = table();
        let checker = Checker::new(&rules, CheckOptions::default());

        let object = SchemaObject::new("users", ObjectKind::Table)
            .with_location(Location::with_line("schema.sql", 3));
        let violations = checker.check(&object).unwrap();
        assert_eq!(violations[0].location, Some(Location::with_line("schema.sql", 3)));
    }

    #[test]
    fn input_error_becomes_violation() {
        let outcome = CheckOutcome {
            object_name: String::new(),
            location: None,
            result: Err(InputError::EmptyName),
        };
        let violations = outcome.into_violations();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, ViolationCode::InputMalformed);
        assert_eq!(violations[0].object_name, "<unnamed>");
    }

    #[test]
    fn plural_heuristic() {
        assert!(looks_plural("users"));
        assert!(looks_plural("order_items"));
        assert!(looks_plural("data"));
        assert!(!looks_plural("user"));
        assert!(!looks_plural("address"));
    }
}
