//! Report schema (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use serde::{Deserialize, Serialize};
use crate::violation::{Severity, Violation, ViolationCode};

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Summary statistics for a report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Total number of violations
    pub total: usize,

    /// Number of errors
    pub errors: usize,

    /// Number of advisory warnings
    pub warnings: usize,

    /// Number of info hints
    pub info: usize,

    /// Number of objects checked
    pub objects_checked: usize,

    /// Number of fields checked
    pub fields_checked: usize,

    /// Number of objects rejected as malformed input
    pub input_errors: usize,
}

/// Lint report (report.json v1)
///
/// This is the stable output format.
/// All fields are versioned and backward-compatible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Summary statistics
    pub summary: ReportSummary,

    /// All violations, in check order
    pub violations: Vec<Violation>,

    /// Metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Report {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary: ReportSummary::default(),
            violations: Vec::new(),
            metadata: None,
        }
    }

    /// Create a report from violations
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        let mut report = Self::new();
        for violation in violations {
            report.add_violation(violation);
        }
        report
    }

    /// Add a violation to the report
    pub fn add_violation(&mut self, violation: Violation) {
        match violation.severity {
            Severity::Error => self.summary.errors += 1,
            Severity::Warn => self.summary.warnings += 1,
            Severity::Info => self.summary.info += 1,
        }

        if violation.code == ViolationCode::InputMalformed {
            self.summary.input_errors += 1;
        }

        self.summary.total += 1;
        self.violations.push(violation);
    }

    /// Record how much input was checked
    pub fn with_counts(mut self, objects_checked: usize, fields_checked: usize) -> Self {
        self.summary.objects_checked = objects_checked;
        self.summary.fields_checked = fields_checked;
        self
    }

    /// Attach metadata
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Check if the report has any errors
    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}
