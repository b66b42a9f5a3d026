use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use schemalint_core::{Config, Report};
use schemalint_engine::{CheckOptions, Checker, RuleTable};
use schemalint_sql::SqlParser;

mod input;
mod render;

use input::InputFormat;

const DEFAULT_CONFIG: &str = "schemalint.toml";

/// schemalint - naming convention linter for relational schemas
#[derive(Parser)]
#[command(name = "schemalint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: schemalint.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check SQL scripts or JSON object descriptors against the conventions
    Check {
        /// Files or directories to check
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Input format
        #[arg(short, long, value_enum, default_value_t = InputFormat::Auto)]
        format: InputFormat,

        /// Output file for report.json
        #[arg(short, long, default_value = "report.json")]
        output: PathBuf,

        /// Also output markdown report
        #[arg(short, long)]
        markdown: Option<PathBuf>,
    },

    /// Print the effective rule table
    Rules,

    /// Write a default config file
    InitConfig {
        /// Where to write the config
        #[arg(default_value = DEFAULT_CONFIG)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Check { paths, format, output, markdown } => {
            let config = load_config(cli.config.as_deref())?;
            let report = check_command(&config, &paths, format, &output, markdown.as_deref(), cli.verbose)?;

            // Advisories alone never fail the run
            if report.has_errors() {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Rules => {
            let config = load_config(cli.config.as_deref())?;
            let rules = RuleTable::from_config(&config.rules).context("Invalid rule configuration")?;
            render::print_rules(&rules);
            Ok(())
        }
        Commands::InitConfig { path, force } => init_config_command(&path, force),
    }
}

/// Log to stderr; `RUST_LOG` wins over `--verbose`
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Explicit path, else `schemalint.toml` in the working directory, else defaults
fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = if let Some(config_path) = path {
        Config::from_file(config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()))?
    } else if Path::new(DEFAULT_CONFIG).exists() {
        Config::from_file(Path::new(DEFAULT_CONFIG))
            .with_context(|| format!("Failed to load config {}", DEFAULT_CONFIG))?
    } else {
        tracing::debug!("no config file found, using defaults");
        Config::default()
    };

    tracing::debug!(dialect = ?config.dialect, "configuration loaded");
    Ok(config)
}

/// Check command - lint every input file, write the report and print it
fn check_command(
    config: &Config,
    paths: &[PathBuf],
    format: InputFormat,
    output: &Path,
    markdown: Option<&Path>,
    verbose: bool,
) -> Result<Report> {
    let report = run_check(config, paths, format, verbose)?;

    report
        .save_to_file(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if verbose {
        eprintln!("{} {}", "Report saved to:".green(), output.display());
    }

    if let Some(md_path) = markdown {
        let markdown_content = render::generate_markdown_report(&report);
        std::fs::write(md_path, markdown_content)
            .with_context(|| format!("Failed to write {}", md_path.display()))?;
        if verbose {
            eprintln!("{} {}", "Markdown report saved to:".green(), md_path.display());
        }
    }

    render::print_report_summary(&report);

    Ok(report)
}

/// Build the report for the given inputs
///
/// Violations are grouped per file in discovery order: parse and decode
/// failures first, then the checker's findings for each object.
fn run_check(config: &Config, paths: &[PathBuf], format: InputFormat, verbose: bool) -> Result<Report> {
    let rules = RuleTable::from_config(&config.rules).context("Invalid rule configuration")?;
    let checker = Checker::new(&rules, CheckOptions::from_config(config));
    let parser = SqlParser::from_dialect(&config.dialect);

    let files = input::discover(paths, format)?;
    if files.is_empty() {
        bail!("No .sql or .json files found in the given paths");
    }

    let mut report = Report::new();
    let mut objects_checked = 0;
    let mut fields_checked = 0;
    let mut file_names = Vec::with_capacity(files.len());

    for (path, file_format) in &files {
        if verbose {
            eprintln!("  {} {}...", "Checking".cyan(), path.display());
        }

        let source = input::load(path, *file_format, &parser)?;

        for error in source.errors {
            let severity = config.severity.get_severity(error.code, error.severity);
            report.add_violation(error.with_severity(severity));
        }

        objects_checked += source.objects.len();
        fields_checked += source.objects.iter().map(|o| o.fields.len()).sum::<usize>();

        for outcome in checker.check_all(&source.objects) {
            for violation in outcome.into_violations() {
                report.add_violation(violation);
            }
        }

        file_names.push(source.path);
    }

    let report = report
        .with_counts(objects_checked, fields_checked)
        .with_metadata(serde_json::json!({
            "rules_fingerprint": rules.fingerprint(),
            "dialect": format!("{:?}", config.dialect),
            "files": file_names,
        }));

    tracing::info!(
        files = files.len(),
        objects = objects_checked,
        violations = report.summary.total,
        "check finished"
    );

    Ok(report)
}

/// Init-config command - write the defaults so they can be edited
fn init_config_command(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }

    Config::default()
        .save_to_file(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("{} {}", "Wrote".green(), path.display());
    Ok(())
}
