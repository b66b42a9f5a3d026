//! schemalint Core
//!
//! Core domain model with stable, versioned types.
//! Never rename violation codes - they are part of the public API.

pub mod violation;
pub mod schema;
pub mod report;
pub mod config;

pub use violation::{Violation, ViolationCode, Severity, Location};
pub use schema::{ObjectKind, TypeFamily, Field, SchemaObject, InputError};
pub use report::{Report, ReportSummary, ReportVersion};
pub use config::{Config, ConfigError, DialectConfig, SeverityThreshold, AllowlistRules, RulesConfig, SuffixRuleConfig};
