//! Schema object descriptors and the canonical type-family system

use serde::{Deserialize, Serialize};
use crate::violation::Location;

/// Kinds of schema objects the naming conventions cover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Table,
    View,
    MaterializedView,
    Function,
    Trigger,
    Index,
    ForeignKey,
    PrimaryKey,
    UniqueConstraint,
    Enum,
    Policy,
}

impl ObjectKind {
    /// Stable lowercase identifier (also the TOML key in `[rules.prefixes]`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::View => "view",
            Self::MaterializedView => "materialized_view",
            Self::Function => "function",
            Self::Trigger => "trigger",
            Self::Index => "index",
            Self::ForeignKey => "foreign_key",
            Self::PrimaryKey => "primary_key",
            Self::UniqueConstraint => "unique_constraint",
            Self::Enum => "enum",
            Self::Policy => "policy",
        }
    }

    /// All kinds, in rule-table order
    pub fn all() -> &'static [ObjectKind] {
        &[
            Self::Table,
            Self::View,
            Self::MaterializedView,
            Self::Function,
            Self::Trigger,
            Self::Index,
            Self::ForeignKey,
            Self::PrimaryKey,
            Self::UniqueConstraint,
            Self::Enum,
            Self::Policy,
        ]
    }

    /// Kinds that are expected to carry a `COMMENT ON`
    pub fn expects_comment(&self) -> bool {
        matches!(
            self,
            Self::Table | Self::View | Self::MaterializedView | Self::Function
        )
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ObjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown object kind '{}'", s))
    }
}

/// Portable type family
///
/// Collapses dialect-specific type spellings into the families that
/// field suffixes talk about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFamily {
    /// Timestamp with time zone
    TimestampTz,

    /// Timestamp without time zone
    Timestamp,

    Date,

    Time,

    Interval,

    /// Exact numeric (decimal/numeric/money)
    Decimal,

    Integer,

    /// Approximate numeric
    Float,

    Boolean,

    Text,

    Uuid,

    Json,

    Bytes,

    Array,

    /// Custom or unrecognized type
    Other,
}

impl TypeFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TimestampTz => "timestamptz",
            Self::Timestamp => "timestamp",
            Self::Date => "date",
            Self::Time => "time",
            Self::Interval => "interval",
            Self::Decimal => "decimal",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Text => "text",
            Self::Uuid => "uuid",
            Self::Json => "json",
            Self::Bytes => "bytes",
            Self::Array => "array",
            Self::Other => "other",
        }
    }

    pub fn all() -> &'static [TypeFamily] {
        &[
            Self::TimestampTz,
            Self::Timestamp,
            Self::Date,
            Self::Time,
            Self::Interval,
            Self::Decimal,
            Self::Integer,
            Self::Float,
            Self::Boolean,
            Self::Text,
            Self::Uuid,
            Self::Json,
            Self::Bytes,
            Self::Array,
            Self::Other,
        ]
    }

    /// Classify a declared SQL type
    ///
    /// Matching is case-insensitive and ignores type parameters, so
    /// `NUMERIC(12, 2)` and `timestamp(3) with time zone` classify the same
    /// as their bare forms. Schema qualifiers (`pg_catalog.int4`) and MySQL
    /// sign modifiers (`BIGINT(20) UNSIGNED`) are dropped. A `NUMBER` with
    /// scale 0 is an integer.
    pub fn classify(declared_type: &str) -> TypeFamily {
        let lowered = declared_type.trim().to_ascii_lowercase();

        if lowered.ends_with("[]") || lowered.starts_with("array") {
            return Self::Array;
        }

        let normalized = normalize_type_name(&lowered);

        match normalized.as_str() {
            "number" if integer_scale(&lowered) => Self::Integer,
            "timestamptz" | "timestamp with time zone" | "timestamp_tz" | "timestamp_ltz"
            | "timestamp with local time zone" => Self::TimestampTz,
            "timestamp" | "timestamp without time zone" | "datetime" | "timestamp_ntz"
            | "datetime2" | "smalldatetime" => Self::Timestamp,
            "date" => Self::Date,
            "time" | "timetz" | "time with time zone" | "time without time zone" => Self::Time,
            "decimal" | "numeric" | "money" | "smallmoney" | "number" | "dec" | "fixed"
            | "bignumeric" | "bigdecimal" => Self::Decimal,
            "smallint" | "integer" | "int" | "bigint" | "tinyint" | "mediumint" | "byteint"
            | "int2" | "int4" | "int8" | "int64" | "smallserial" | "serial" | "bigserial"
            | "serial2" | "serial4" | "serial8" => Self::Integer,
            "real" | "float" | "float4" | "float8" | "float64" | "double"
            | "double precision" | "binary_float" | "binary_double" => Self::Float,
            "boolean" | "bool" => Self::Boolean,
            "text" | "varchar" | "character varying" | "char" | "character" | "bpchar"
            | "nvarchar" | "nchar" | "string" | "citext" | "clob" | "tinytext"
            | "mediumtext" | "longtext" | "varchar2" | "nvarchar2" => Self::Text,
            "uuid" | "uniqueidentifier" => Self::Uuid,
            "json" | "jsonb" | "variant" | "object" => Self::Json,
            "bytea" | "blob" | "tinyblob" | "mediumblob" | "longblob" | "binary"
            | "varbinary" | "bytes" => Self::Bytes,
            other if other.starts_with("interval") => Self::Interval,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for TypeFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TypeFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|family| family.as_str() == wanted)
            .ok_or_else(|| format!("unknown type family '{}'", s))
    }
}

/// Bare type name: no parameters, sign modifiers, schema or quotes
fn normalize_type_name(lowered: &str) -> String {
    let mut depth = 0usize;
    let mut bare = String::with_capacity(lowered.len());

    for ch in lowered.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '"' | '`' => {}
            _ if depth == 0 => bare.push(ch),
            _ => {}
        }
    }

    let words: Vec<&str> = bare
        .split_whitespace()
        .filter(|w| !matches!(*w, "unsigned" | "signed" | "zerofill"))
        .collect();
    let joined = words.join(" ");

    match joined.rsplit_once('.') {
        Some((_, name)) => name.to_string(),
        None => joined,
    }
}

/// `number(p)` or `number(p, 0)`
fn integer_scale(lowered: &str) -> bool {
    let Some(open) = lowered.find('(') else {
        return false;
    };
    let params = lowered[open + 1..].split(')').next().unwrap_or("");

    match params.split(',').nth(1) {
        Some(scale) => scale.trim() == "0",
        None => !params.trim().is_empty(),
    }
}

/// A field (column, or parameter-less attribute) of a schema object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field name
    pub name: String,

    /// Declared SQL type, as written
    pub declared_type: String,

    /// Comment attached with `COMMENT ON COLUMN`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            comment: None,
        }
    }

    /// Set comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Type family of the declared type
    pub fn family(&self) -> TypeFamily {
        TypeFamily::classify(&self.declared_type)
    }
}

/// One object to check
///
/// `kind` is optional so that incomplete descriptors can still be
/// represented; the checker rejects them with an [`InputError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaObject {
    /// Object name, possibly schema-qualified
    #[serde(default)]
    pub name: String,

    /// Object kind
    #[serde(default)]
    pub kind: Option<ObjectKind>,

    /// Fields in declaration order
    #[serde(default)]
    pub fields: Vec<Field>,

    /// Comment attached with `COMMENT ON`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Where the object was declared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl SchemaObject {
    /// Create a new object with no fields
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind: Some(kind),
            fields: Vec::new(),
            comment: None,
            location: None,
        }
    }

    /// Set fields
    pub fn with_fields(mut self, fields: Vec<Field>) -> Self {
        self.fields = fields;
        self
    }

    /// Set comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Set location
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Name without schema qualification or identifier quotes
    ///
    /// `public.tb_users` and `"public"."tb_users"` both give `tb_users`.
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Find a field by name
    pub fn find_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Find a field by name for in-place updates
    pub fn find_field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    /// Reject descriptors the checker cannot evaluate
    pub fn validate(&self) -> Result<ObjectKind, InputError> {
        if self.name.trim().is_empty() {
            return Err(InputError::EmptyName);
        }

        let kind = self.kind.ok_or_else(|| InputError::MissingKind {
            object: self.name.clone(),
        })?;

        if let Some(index) = self.fields.iter().position(|f| f.name.trim().is_empty()) {
            return Err(InputError::EmptyFieldName {
                object: self.name.clone(),
                index,
            });
        }

        Ok(kind)
    }

    /// Decode a JSON array of descriptors
    ///
    /// Each element is decoded on its own so that one malformed entry does
    /// not discard the rest of the batch. Only a document that is not an
    /// array at all fails as a whole.
    pub fn batch_from_json(json: &str) -> Result<Vec<Result<SchemaObject, InputError>>, InputError> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| InputError::Malformed { index: None, reason: e.to_string() })?;

        let serde_json::Value::Array(items) = value else {
            return Err(InputError::Malformed {
                index: None,
                reason: "expected a JSON array of schema objects".to_string(),
            });
        };

        Ok(items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value(item).map_err(|e| InputError::Malformed {
                    index: Some(index),
                    reason: e.to_string(),
                })
            })
            .collect())
    }
}

/// Last path segment of a possibly qualified identifier, unquoted
pub fn local_name(name: &str) -> &str {
    let mut in_quotes = false;
    let mut start = 0usize;

    for (idx, ch) in name.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '.' if !in_quotes => start = idx + 1,
            _ => {}
        }
    }

    let last = name[start..].trim();
    last.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(last)
}

/// A schema object descriptor that cannot be checked
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("Schema object has an empty name")]
    EmptyName,

    #[error("Schema object '{object}' has no kind")]
    MissingKind { object: String },

    #[error("Field #{index} of '{object}' has an empty name")]
    EmptyFieldName { object: String, index: usize },

    #[error("Malformed schema object{}: {reason}", .index.map(|i| format!(" at index {}", i)).unwrap_or_default())]
    Malformed { index: Option<usize>, reason: String },
}
