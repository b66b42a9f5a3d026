//! Console and markdown rendering

use colored::Colorize;
use schemalint_core::{Report, Severity};
use schemalint_engine::RuleTable;

/// Print report summary to stdout
pub fn print_report_summary(report: &Report) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Naming Convention Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Version: {}", report.version);
    println!("Timestamp: {}", report.timestamp);
    println!();

    println!("{}", "Summary:".bold());
    println!(
        "  Checked: {} objects, {} fields",
        report.summary.objects_checked, report.summary.fields_checked
    );
    println!("  Total violations: {}", report.summary.total);

    if report.summary.errors > 0 {
        println!("  Errors:   {}", format!("{}", report.summary.errors).red().bold());
    } else {
        println!("  Errors:   {}", format!("{}", report.summary.errors).green());
    }

    if report.summary.warnings > 0 {
        println!("  Warnings: {}", format!("{}", report.summary.warnings).yellow());
    } else {
        println!("  Warnings: {}", format!("{}", report.summary.warnings).green());
    }

    println!("  Info:     {}", report.summary.info);

    if report.summary.input_errors > 0 {
        println!(
            "  Rejected input: {}",
            format!("{}", report.summary.input_errors).red()
        );
    }
    println!();

    if report.violations.is_empty() {
        println!("{}", "✓ No issues found!".green().bold());
    } else {
        println!("{}", "Violations:".bold());
        for violation in &report.violations {
            let severity_str = match violation.severity {
                Severity::Error => "ERROR".red().bold(),
                Severity::Warn => "WARN".yellow().bold(),
                Severity::Info => "INFO".cyan(),
            };

            println!(
                "  [{}] {} {}: {}",
                severity_str,
                violation.subject().bold(),
                violation.code,
                violation.message
            );

            if let Some(loc) = &violation.location {
                println!("    at {}", loc);
            }

            if let Some(exp) = &violation.expected {
                println!("    Expected: {}", exp);
            }
            if let Some(act) = &violation.actual {
                println!("    Actual:   {}", act);
            }
        }
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}

/// Generate markdown report
pub fn generate_markdown_report(report: &Report) -> String {
    let mut md = String::new();

    md.push_str("# Naming Convention Report\n\n");
    md.push_str(&format!("**Version:** {}\n\n", report.version));
    md.push_str(&format!("**Timestamp:** {}\n\n", report.timestamp));

    md.push_str("## Summary\n\n");
    md.push_str(&format!(
        "- Checked: {} objects, {} fields\n",
        report.summary.objects_checked, report.summary.fields_checked
    ));
    md.push_str(&format!("- Total violations: {}\n", report.summary.total));
    md.push_str(&format!("- Errors: {}\n", report.summary.errors));
    md.push_str(&format!("- Warnings: {}\n", report.summary.warnings));
    md.push_str(&format!("- Info: {}\n", report.summary.info));
    md.push('\n');

    if report.violations.is_empty() {
        md.push_str("✅ **No issues found!**\n");
        return md;
    }

    md.push_str("## Violations\n\n");
    md.push_str("| Severity | Code | Object | Message | Location |\n");
    md.push_str("|----------|------|--------|---------|----------|\n");

    for violation in &report.violations {
        let severity_emoji = match violation.severity {
            Severity::Error => "❌",
            Severity::Warn => "⚠️",
            Severity::Info => "ℹ️",
        };

        let location = violation
            .location
            .as_ref()
            .map(|l| l.to_string())
            .unwrap_or_default();

        md.push_str(&format!(
            "| {} {} | `{}` | `{}` | {} | {} |\n",
            severity_emoji,
            violation.severity,
            violation.code,
            violation.subject(),
            escape_cell(&violation.message),
            location
        ));
    }

    md
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Print the effective rule table
pub fn print_rules(rules: &RuleTable) {
    println!("{}", "Object prefixes".bold().bright_blue());
    for rule in rules.naming_rules() {
        println!(
            "  {:<20} {:<8} {}",
            rule.object_kind.as_str(),
            rule.prefix.green(),
            rule.description.dimmed()
        );
    }
    println!();

    println!("{}", "Field suffixes".bold().bright_blue());
    for rule in rules.suffix_rules() {
        println!(
            "  {:<8} {:<24} {}",
            rule.suffix.green(),
            rule.expected_display(),
            rule.description.dimmed()
        );
    }
    println!();

    println!("{}", "Exempt field names".bold().bright_blue());
    println!("  {}", rules.exempt_fields().collect::<Vec<_>>().join(", "));
    println!();

    println!("Fingerprint: {}", rules.fingerprint());
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemalint_core::{Location, Violation, ViolationCode};

    #[test]
    fn markdown_lists_each_violation() {
        let report = Report::from_violations(vec![
            Violation::new(
                ViolationCode::ObjectPrefixMissing,
                "orders",
                "Name of table 'orders' must start with 'tb_'",
            )
            .with_location(Some(Location::with_line("schema.sql", 14))),
            Violation::new(
                ViolationCode::FieldSuffixMissing,
                "tb_orders",
                "Field has no suffix | consider 'total_amt'",
            )
            .with_field("total"),
        ])
        .with_counts(2, 1);

        let md = generate_markdown_report(&report);
        assert!(md.contains("- Errors: 1"));
        assert!(md.contains("- Warnings: 1"));
        assert!(md.contains("| `OBJECT_PREFIX_MISSING` | `orders` |"));
        assert!(md.contains("schema.sql:14"));
        assert!(md.contains("`tb_orders.total`"));
        assert!(md.contains("no suffix \\| consider"));
    }

    #[test]
    fn markdown_for_clean_report() {
        let md = generate_markdown_report(&Report::new());
        assert!(md.contains("No issues found"));
        assert!(!md.contains("## Violations"));
    }
}
