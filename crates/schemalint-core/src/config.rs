//! Configuration schema (schemalint.toml)

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use crate::violation::{Severity, ViolationCode};

/// SQL dialect used to read DDL files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectConfig {
    /// PostgreSQL SQL dialect
    Postgres,

    /// Generic ANSI SQL
    Ansi,

    /// BigQuery SQL dialect
    BigQuery,

    /// Snowflake SQL dialect
    Snowflake,

    /// MySQL SQL dialect
    MySql,
}

impl Default for DialectConfig {
    fn default() -> Self {
        Self::Postgres
    }
}

/// Severity overrides for specific violation codes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeverityThreshold {
    /// Map of violation code to severity override
    #[serde(default)]
    pub overrides: HashMap<String, Severity>,
}

impl SeverityThreshold {
    /// Get severity for a violation code, or default
    pub fn get_severity(&self, code: ViolationCode, default: Severity) -> Severity {
        self.overrides
            .get(code.as_str())
            .copied()
            .unwrap_or(default)
    }

    /// Set severity override for a code
    pub fn set_override(&mut self, code: ViolationCode, severity: Severity) {
        self.overrides.insert(code.as_str().to_string(), severity);
    }

    /// Override keys that name no known violation code
    pub fn unknown_codes(&self) -> Vec<&str> {
        let mut unknown: Vec<&str> = self
            .overrides
            .keys()
            .map(String::as_str)
            .filter(|key| key.parse::<ViolationCode>().is_err())
            .collect();
        unknown.sort_unstable();
        unknown
    }
}

/// Objects exempted from checking
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllowlistRules {
    /// Completely skip checks for these objects (glob patterns)
    #[serde(default)]
    pub skip_objects: Vec<String>,
}

impl AllowlistRules {
    /// Check if a name matches any pattern in the list
    fn matches_pattern(name: &str, patterns: &[String]) -> bool {
        patterns.iter().any(|pattern| {
            // Simple glob matching (* and **)
            if pattern.contains('*') {
                glob_match(pattern, name)
            } else {
                pattern == name
            }
        })
    }

    /// Check if an object should be skipped
    pub fn is_object_skipped(&self, name: &str) -> bool {
        Self::matches_pattern(name, &self.skip_objects)
    }
}

/// An additional field-suffix rule declared in `[[rules.suffixes]]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuffixRuleConfig {
    /// Suffix including the leading underscore, e.g. `_kg`
    pub suffix: String,

    /// Accepted type families (`decimal`, `integer`, ...)
    pub types: Vec<String>,

    /// Rationale shown by `schemalint rules`
    #[serde(default)]
    pub description: Option<String>,
}

/// Rule toggles and rule-table customizations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Require lowercase snake_case object and field names
    #[serde(default = "default_true")]
    pub snake_case: bool,

    /// Emit the plural-table-name hint
    #[serde(default)]
    pub plural_tables: bool,

    /// Emit a hint for tables, views and functions without a comment
    #[serde(default)]
    pub require_comments: bool,

    /// Prefix overrides keyed by object kind (`table = "tbl_"`)
    #[serde(default)]
    pub prefixes: BTreeMap<String, String>,

    /// Extra suffix rules, appended after the built-in ones
    #[serde(default)]
    pub suffixes: Vec<SuffixRuleConfig>,

    /// Extra self-documenting field names
    #[serde(default)]
    pub exempt_fields: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            snake_case: true,
            plural_tables: false,
            require_comments: false,
            prefixes: BTreeMap::new(),
            suffixes: Vec::new(),
            exempt_fields: Vec::new(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// SQL dialect
    #[serde(default)]
    pub dialect: DialectConfig,

    /// Severity overrides
    #[serde(default)]
    pub severity: SeverityThreshold,

    /// Allowlist rules
    #[serde(default)]
    pub allowlist: AllowlistRules,

    /// Rule toggles and customizations
    #[serde(default)]
    pub rules: RulesConfig,
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        let unknown = config.severity.unknown_codes();
        if !unknown.is_empty() {
            return Err(ConfigError::InvalidRule(format!(
                "unknown violation code(s) in [severity.overrides]: {}",
                unknown.join(", ")
            )));
        }

        Ok(config)
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        Ok(())
    }
}

/// Glob matching where every `*` (or `**`) matches any run of characters
fn glob_match(pattern: &str, text: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == text;
    }

    let mut pieces = pattern.split('*');
    let first = pieces.next().unwrap_or("");
    let Some(rest) = text.strip_prefix(first) else {
        return false;
    };

    let middle: Vec<&str> = pieces.collect();
    let (last, middle) = match middle.split_last() {
        Some((last, middle)) => (*last, middle),
        None => return true,
    };

    let mut remaining = rest;
    for piece in middle.iter().filter(|p| !p.is_empty()) {
        match remaining.find(piece) {
            Some(pos) => remaining = &remaining[pos + piece.len()..],
            None => return false,
        }
    }

    remaining.len() >= last.len() && remaining.ends_with(last)
}

/// Config error types
///
/// All of these are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid rule definition: {0}")]
    InvalidRule(String),
}
