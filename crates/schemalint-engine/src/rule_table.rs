//! Rule table: the canonical naming conventions
//!
//! Maps each object kind to its required prefix and each field suffix to
//! the type families it implies. Built once at startup, then shared
//! read-only by every check.

use regex::Regex;
use schemalint_core::{ConfigError, ObjectKind, RulesConfig, TypeFamily};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// Built-in object prefixes
const BUILTIN_PREFIXES: &[(ObjectKind, &str, &str)] = &[
    (ObjectKind::Table, "tb_", "Tables start with tb_ so they never collide with views"),
    (ObjectKind::View, "vw_", "Views start with vw_"),
    (ObjectKind::MaterializedView, "mv_", "Materialized views start with mv_ to flag refresh cost"),
    (ObjectKind::Function, "fn_", "Functions start with fn_"),
    (ObjectKind::Trigger, "tr_", "Triggers start with tr_"),
    (ObjectKind::Index, "idx_", "Indexes start with idx_"),
    (ObjectKind::ForeignKey, "fk_", "Foreign key constraints start with fk_"),
    (ObjectKind::PrimaryKey, "pk_", "Primary key constraints start with pk_"),
    (ObjectKind::UniqueConstraint, "uq_", "Unique constraints start with uq_"),
    (ObjectKind::Enum, "enum_", "Enum types start with enum_"),
    (ObjectKind::Policy, "pol_", "Row-level security policies start with pol_"),
];

/// Built-in field suffixes
///
/// Order matters: it is the evaluation order of `suggest_suffix`.
const BUILTIN_SUFFIXES: &[(&str, &[TypeFamily], &str)] = &[
    ("_ts", &[TypeFamily::TimestampTz], "Point in time, stored with time zone"),
    ("_dt", &[TypeFamily::Date], "Calendar date without time"),
    ("_tm", &[TypeFamily::Time], "Time of day"),
    ("_dur", &[TypeFamily::Interval], "Duration"),
    ("_amt", &[TypeFamily::Decimal], "Monetary amount, exact numeric"),
    ("_pct", &[TypeFamily::Decimal, TypeFamily::Float], "Percentage"),
    ("_rate", &[TypeFamily::Decimal, TypeFamily::Float], "Rate or ratio"),
    ("_qty", &[TypeFamily::Integer], "Quantity of items"),
    ("_cnt", &[TypeFamily::Integer], "Count"),
    ("_id", &[TypeFamily::Integer, TypeFamily::Uuid], "Reference to another row's id"),
    ("_flag", &[TypeFamily::Boolean], "Boolean flag"),
    ("_desc", &[TypeFamily::Text], "Free-form description"),
    ("_code", &[TypeFamily::Text], "Short business code"),
    ("_url", &[TypeFamily::Text], "URL"),
    ("_json", &[TypeFamily::Json], "Structured JSON document"),
];

/// Field names that are self-documenting and need no suffix
pub const EXEMPT_FIELDS: &[&str] = &[
    "id",
    "name",
    "email",
    "created_at",
    "updated_at",
    "deleted_at",
    "created_by",
    "updated_by",
    "deleted_by",
];

/// Prefix requirement for one object kind
#[derive(Debug, Clone)]
pub struct NamingRule {
    /// Kind the rule applies to
    pub object_kind: ObjectKind,

    /// Required prefix, e.g. `tb_`
    pub prefix: String,

    /// Compiled `^prefix` matcher
    pub prefix_pattern: Regex,

    /// Rationale shown to users
    pub description: String,
}

impl NamingRule {
    fn new(object_kind: ObjectKind, prefix: &str, description: impl Into<String>) -> Result<Self, ConfigError> {
        validate_token(prefix, TokenKind::Prefix)?;

        Ok(Self {
            object_kind,
            prefix: prefix.to_string(),
            prefix_pattern: compile(&format!("^{}", regex::escape(prefix)))?,
            description: description.into(),
        })
    }

    /// Case-sensitive prefix match
    pub fn matches(&self, name: &str) -> bool {
        self.prefix_pattern.is_match(name)
    }
}

/// Semantic type implied by a field suffix
#[derive(Debug, Clone)]
pub struct SuffixRule {
    /// Suffix including the underscore, e.g. `_amt`
    pub suffix: String,

    /// Compiled `.+suffix$` matcher
    pub suffix_pattern: Regex,

    /// Type families the suffix accepts
    pub expected: Vec<TypeFamily>,

    /// Rationale shown to users
    pub description: String,
}

impl SuffixRule {
    fn new(suffix: &str, expected: Vec<TypeFamily>, description: impl Into<String>) -> Result<Self, ConfigError> {
        validate_token(suffix, TokenKind::Suffix)?;

        if expected.is_empty() {
            return Err(ConfigError::InvalidRule(format!(
                "suffix '{}' must accept at least one type family",
                suffix
            )));
        }

        Ok(Self {
            suffix: suffix.to_string(),
            suffix_pattern: compile(&format!("^.+{}$", regex::escape(suffix)))?,
            expected,
            description: description.into(),
        })
    }

    /// Case-sensitive suffix match; the bare suffix alone does not count
    pub fn matches(&self, field_name: &str) -> bool {
        self.suffix_pattern.is_match(field_name)
    }

    /// Whether a type family satisfies this suffix
    pub fn accepts(&self, family: TypeFamily) -> bool {
        self.expected.contains(&family)
    }

    /// `decimal` or `integer or uuid`
    pub fn expected_display(&self) -> String {
        self.expected
            .iter()
            .map(TypeFamily::as_str)
            .collect::<Vec<_>>()
            .join(" or ")
    }
}

/// Immutable registry of naming rules
#[derive(Debug, Clone)]
pub struct RuleTable {
    naming: Vec<NamingRule>,
    suffixes: Vec<SuffixRule>,
    exempt: BTreeSet<String>,
    snake_case: Regex,
}

impl RuleTable {
    /// The built-in conventions
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_config(&RulesConfig::default())
    }

    /// Built-in conventions with config overrides applied
    ///
    /// `[rules.prefixes]` replaces the prefix of a kind; `[[rules.suffixes]]`
    /// replaces a built-in suffix of the same name or is appended after the
    /// built-in ones; `exempt_fields` extends the exempt set.
    pub fn from_config(config: &RulesConfig) -> Result<Self, ConfigError> {
        let mut naming = BUILTIN_PREFIXES
            .iter()
            .map(|(kind, prefix, description)| NamingRule::new(*kind, prefix, *description))
            .collect::<Result<Vec<_>, _>>()?;

        for (key, prefix) in &config.prefixes {
            let kind: ObjectKind = key
                .parse()
                .map_err(|e: String| ConfigError::InvalidRule(format!("[rules.prefixes]: {}", e)))?;

            let rule = NamingRule::new(kind, prefix, format!("Configured prefix for {}", kind))?;
            match naming.iter_mut().find(|r| r.object_kind == kind) {
                Some(existing) => *existing = rule,
                None => naming.push(rule),
            }
        }

        let mut suffixes = BUILTIN_SUFFIXES
            .iter()
            .map(|(suffix, families, description)| SuffixRule::new(suffix, families.to_vec(), *description))
            .collect::<Result<Vec<_>, _>>()?;

        for custom in &config.suffixes {
            let families = custom
                .types
                .iter()
                .map(|t| t.parse::<TypeFamily>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ConfigError::InvalidRule(format!("suffix '{}': {}", custom.suffix, e)))?;

            let description = custom
                .description
                .clone()
                .unwrap_or_else(|| format!("Configured suffix {}", custom.suffix));

            let rule = SuffixRule::new(&custom.suffix, families, description)?;
            match suffixes.iter_mut().find(|r| r.suffix == rule.suffix) {
                Some(existing) => *existing = rule,
                None => suffixes.push(rule),
            }
        }

        let mut exempt: BTreeSet<String> = EXEMPT_FIELDS.iter().map(|s| s.to_string()).collect();
        for field in &config.exempt_fields {
            if field.trim().is_empty() {
                return Err(ConfigError::InvalidRule("exempt field names must not be empty".to_string()));
            }
            exempt.insert(field.clone());
        }

        let table = Self {
            naming,
            suffixes,
            exempt,
            snake_case: compile(r"^[a-z][a-z0-9]*(_[a-z0-9]+)*$")?,
        };

        tracing::debug!(
            prefixes = table.naming.len(),
            suffixes = table.suffixes.len(),
            exempt = table.exempt.len(),
            "rule table built"
        );

        Ok(table)
    }

    /// Prefix rule for an object kind, if any
    pub fn prefix_rule(&self, kind: ObjectKind) -> Option<&NamingRule> {
        self.naming.iter().find(|r| r.object_kind == kind)
    }

    /// Suffix rule matching a field name; the longest suffix wins
    pub fn suffix_rule(&self, field_name: &str) -> Option<&SuffixRule> {
        self.suffixes
            .iter()
            .filter(|rule| rule.matches(field_name))
            .fold(None, |best: Option<&SuffixRule>, rule| match best {
                Some(b) if b.suffix.len() >= rule.suffix.len() => Some(b),
                _ => Some(rule),
            })
    }

    /// Whether a field name is self-documenting
    pub fn is_exempt(&self, field_name: &str) -> bool {
        self.exempt.contains(field_name)
    }

    /// First suffix (table order) that accepts a type family
    pub fn suggest_suffix(&self, family: TypeFamily) -> Option<&SuffixRule> {
        self.suffixes.iter().find(|rule| rule.accepts(family))
    }

    /// Lowercase snake_case check
    pub fn is_snake_case(&self, name: &str) -> bool {
        self.snake_case.is_match(name)
    }

    pub fn naming_rules(&self) -> &[NamingRule] {
        &self.naming
    }

    pub fn suffix_rules(&self) -> &[SuffixRule] {
        &self.suffixes
    }

    pub fn exempt_fields(&self) -> impl Iterator<Item = &str> {
        self.exempt.iter().map(String::as_str)
    }

    /// Stable hash of the effective rules, recorded in reports
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();

        for rule in &self.naming {
            hasher.update(format!("prefix|{}|{}\n", rule.object_kind, rule.prefix));
        }
        for rule in &self.suffixes {
            hasher.update(format!("suffix|{}|{}\n", rule.suffix, rule.expected_display()));
        }
        for field in &self.exempt {
            hasher.update(format!("exempt|{}\n", field));
        }

        hex::encode(hasher.finalize())
    }
}

#[derive(Clone, Copy)]
enum TokenKind {
    Prefix,
    Suffix,
}

/// Prefixes look like `tb_`, suffixes like `_amt`
fn validate_token(token: &str, kind: TokenKind) -> Result<(), ConfigError> {
    let valid_chars = token
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    let well_formed = match kind {
        TokenKind::Prefix => token.len() > 1 && token.ends_with('_') && !token.starts_with('_'),
        TokenKind::Suffix => token.len() > 1 && token.starts_with('_') && !token.ends_with('_'),
    };

    if valid_chars && well_formed {
        Ok(())
    } else {
        let what = match kind {
            TokenKind::Prefix => "prefix",
            TokenKind::Suffix => "suffix",
        };
        Err(ConfigError::InvalidRule(format!("malformed {} '{}'", what, token)))
    }
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::InvalidRule(format!("pattern '{}': {}", pattern, e)))
}
