//! Violation codes and convention findings
//!
//! IMPORTANT: Violation codes are versioned and stable.
//! NEVER rename or remove codes - they are part of the public API.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Violation code registry (v1)
///
/// These codes are STABLE and VERSIONED.
/// Do NOT rename or remove codes - only add new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationCode {
    // Object naming (1xxx)
    /// Object name does not start with the prefix required for its kind
    ObjectPrefixMissing,

    /// Object name is not lowercase snake_case
    ObjectNameNotSnakeCase,

    /// Table name does not look plural (advisory heuristic)
    TableNameNotPlural,

    /// Object carries no descriptive comment
    ObjectCommentMissing,

    // Field naming (2xxx)
    /// Field name is not lowercase snake_case
    FieldNameNotSnakeCase,

    /// Field suffix implies a type family the declared type does not belong to
    FieldSuffixTypeMismatch,

    /// Field carries no semantic suffix and is not self-documenting
    FieldSuffixMissing,

    // Input problems (9xxx)
    /// Schema object descriptor could not be checked
    InputMalformed,

    /// DDL statement could not be parsed
    SqlParseError,
}

impl ViolationCode {
    /// Get the violation code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ObjectPrefixMissing => "OBJECT_PREFIX_MISSING",
            Self::ObjectNameNotSnakeCase => "OBJECT_NAME_NOT_SNAKE_CASE",
            Self::TableNameNotPlural => "TABLE_NAME_NOT_PLURAL",
            Self::ObjectCommentMissing => "OBJECT_COMMENT_MISSING",
            Self::FieldNameNotSnakeCase => "FIELD_NAME_NOT_SNAKE_CASE",
            Self::FieldSuffixTypeMismatch => "FIELD_SUFFIX_TYPE_MISMATCH",
            Self::FieldSuffixMissing => "FIELD_SUFFIX_MISSING",
            Self::InputMalformed => "INPUT_MALFORMED",
            Self::SqlParseError => "SQL_PARSE_ERROR",
        }
    }

    /// Default severity for this code before config overrides are applied
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::ObjectPrefixMissing
            | Self::FieldSuffixTypeMismatch
            | Self::InputMalformed
            | Self::SqlParseError => Severity::Error,
            Self::ObjectNameNotSnakeCase
            | Self::FieldNameNotSnakeCase
            | Self::FieldSuffixMissing => Severity::Warn,
            Self::TableNameNotPlural | Self::ObjectCommentMissing => Severity::Info,
        }
    }

    /// All codes, in registry order
    pub fn all() -> &'static [ViolationCode] {
        &[
            Self::ObjectPrefixMissing,
            Self::ObjectNameNotSnakeCase,
            Self::TableNameNotPlural,
            Self::ObjectCommentMissing,
            Self::FieldNameNotSnakeCase,
            Self::FieldSuffixTypeMismatch,
            Self::FieldSuffixMissing,
            Self::InputMalformed,
            Self::SqlParseError,
        ]
    }
}

impl std::fmt::Display for ViolationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ViolationCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| format!("unknown violation code '{}'", s))
    }
}

/// Violation severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational hint
    Info,

    /// Advisory - should be reviewed but not blocking
    Warn,

    /// Error - hard rule violation that should fail CI
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Source location in a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// File path as given on the command line
    pub file: String,

    /// Optional line number (1-indexed)
    pub line: Option<usize>,
}

impl Location {
    /// Create a new location with just a file path
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
        }
    }

    /// Create a location with file and line number
    pub fn with_line(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line: Some(line),
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.file, line),
            None => write!(f, "{}", self.file),
        }
    }
}

/// A naming-convention finding for one object (and optionally one of its fields)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Name of the object the finding is about
    pub object_name: String,

    /// Field name, for field-level findings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,

    /// Stable code of the rule that was violated
    pub code: ViolationCode,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Expected value (prefix, suffix or type family)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,

    /// Actual value found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,

    /// Source location (best-effort)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Violation {
    /// Create a new violation using the code's default severity
    pub fn new(code: ViolationCode, object_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            object_name: object_name.into(),
            field_name: None,
            code,
            severity: code.default_severity(),
            message: message.into(),
            expected: None,
            actual: None,
            location: None,
        }
    }

    /// Attach the offending field
    pub fn with_field(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = Some(field_name.into());
        self
    }

    /// Set the severity
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Set expected/actual values
    pub fn with_comparison(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }

    /// Set the location
    pub fn with_location(mut self, location: Option<Location>) -> Self {
        self.location = location;
        self
    }

    /// Advisory findings never fail a run on their own
    pub fn is_advisory(&self) -> bool {
        self.severity < Severity::Error
    }

    /// `object` or `object.field`
    pub fn subject(&self) -> String {
        match &self.field_name {
            Some(field) => format!("{}.{}", self.object_name, field),
            None => self.object_name.clone(),
        }
    }
}
