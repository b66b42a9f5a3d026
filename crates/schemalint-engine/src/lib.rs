//! schemalint engine - Core business logic
//!
//! This crate implements the convention checks:
//! - Rule table (kind prefixes, field suffixes, exempt names)
//! - Checker for single objects and parallel batches

pub mod rule_table;
pub mod checker;

pub use rule_table::{RuleTable, NamingRule, SuffixRule, EXEMPT_FIELDS};
pub use checker::{Checker, CheckOptions, CheckOutcome};
